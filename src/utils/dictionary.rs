#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fs;

use log::info;

use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Wordlist used when no file is configured.  One lowercase word per line;
// the line count must be prime or startup fails.
pub const DEFAULT_WORDLIST: &str = include_str!("../../resources/words.txt");

// Seed used when the configuration does not specify one.  Changing the seed
// changes every assigned index, so treat it as part of the installation's
// identity.
pub const DEFAULT_SHUFFLE_SEED: u32 = 1234;

// Generator constants.  These are load-bearing: the word/index assignment is
// only reproducible across builds and machines if the exact same mix is used.
const RNG_INCREMENT: u32 = 0x9E37_79B9;
const RNG_MULT_1: u32 = 0x21F0_AAAD;
const RNG_MULT_2: u32 = 0x735A_2D97;

// ***************************************************************************
//                              ShuffleRng
// ***************************************************************************
// ---------------------------------------------------------------------------
// ShuffleRng:
// ---------------------------------------------------------------------------
/** Deterministic 32-bit generator that drives the dictionary shuffle.  The
 * state advances by a fixed odd increment on every draw and a two-round
 * xor/multiply avalanche scrambles a copy of the state into the output.
 * Given the same seed it produces the same sequence on every platform, which
 * is what lets assigned indices act as stable identifiers.
 */
pub struct ShuffleRng {
    state: u32,
}

impl ShuffleRng {
    pub fn new(seed: u32) -> Self {
        ShuffleRng { state: seed }
    }

    /// Next raw 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(RNG_INCREMENT);
        let mut z = self.state;
        z ^= z >> 16;
        z = z.wrapping_mul(RNG_MULT_1);
        z ^= z >> 15;
        z = z.wrapping_mul(RNG_MULT_2);
        z ^= z >> 15;
        z
    }

    /// Next output mapped uniformly onto [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }
}

// ***************************************************************************
//                              Dictionary
// ***************************************************************************
// ---------------------------------------------------------------------------
// Dictionary:
// ---------------------------------------------------------------------------
/** The word/index bijection served for the process lifetime.  Built once at
 * startup from a wordlist and a seed, then read-only: handlers share it
 * through the runtime context without locking.
 *
 * Index assignment happens by shuffling the loaded words with a seeded
 * Fisher-Yates pass and giving the word at position k the index k.  The
 * inverse table is dense, so a vector serves as index -> word.
 */
pub struct Dictionary {
    word_to_index: HashMap<String, usize>,
    index_to_word: Vec<String>,
}

impl Dictionary {
    // -----------------------------------------------------------------------
    // new:
    // -----------------------------------------------------------------------
    /** Build the dictionary from raw wordlist text.  Fails if the filtered
     * word count is not prime; that is a configuration error and the caller
     * is expected to abort startup.
     */
    pub fn new(content: &str, seed: u32) -> Result<Self, Errors> {
        let mut words = load_words(content)?;
        shuffle(&mut words, seed);

        let mut word_to_index = HashMap::with_capacity(words.len());
        for (index, word) in words.iter().enumerate() {
            word_to_index.insert(word.clone(), index);
        }

        Ok(Dictionary { word_to_index, index_to_word: words })
    }

    // -----------------------------------------------------------------------
    // from_file:
    // -----------------------------------------------------------------------
    /** Build the dictionary from a wordlist file. */
    pub fn from_file(path: &str, seed: u32) -> Result<Self, Errors> {
        info!("{}", Errors::ReadingWordlistFile(path.to_string()));
        let content = fs::read_to_string(path)?;
        Dictionary::new(&content, seed)
    }

    // -----------------------------------------------------------------------
    // size:
    // -----------------------------------------------------------------------
    /// Number of words; prime by construction.
    pub fn size(&self) -> usize {
        self.index_to_word.len()
    }

    // -----------------------------------------------------------------------
    // has_word:
    // -----------------------------------------------------------------------
    /// Case-insensitive membership test.  Total; never fails.
    pub fn has_word(&self, word: &str) -> bool {
        self.word_to_index.contains_key(&word.to_lowercase())
    }

    // -----------------------------------------------------------------------
    // get_index:
    // -----------------------------------------------------------------------
    /** Case-insensitive lookup of a word's assigned index.  Absent words are
     * reported as a typed not-found error, never a sentinel value.
     */
    pub fn get_index(&self, word: &str) -> Result<usize, Errors> {
        match self.word_to_index.get(&word.to_lowercase()) {
            Some(index) => Ok(*index),
            None => Err(Errors::WordNotFound(word.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // get_word:
    // -----------------------------------------------------------------------
    /** Inverse lookup.  Indices at or beyond size() are a typed not-found
     * error.
     */
    pub fn get_word(&self, index: usize) -> Result<&str, Errors> {
        match self.index_to_word.get(index) {
            Some(word) => Ok(word),
            None => Err(Errors::IndexNotFound(index)),
        }
    }
}

// ***************************************************************************
//                             Public Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// load_words:
// ---------------------------------------------------------------------------
/** Normalize and filter raw wordlist text: trim each line, lowercase it, and
 * keep only tokens made of one or more lowercase Latin letters.  Output
 * order is input order.  The surviving count must be prime; anything else is
 * a fatal configuration error and the wordlist itself has to change.
 */
pub fn load_words(content: &str) -> Result<Vec<String>, Errors> {
    let words: Vec<String> = content
        .lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_lowercase()))
        .collect();

    if !is_prime(words.len()) {
        return Err(Errors::NonPrimeWordCount(words.len()));
    }
    Ok(words)
}

// ---------------------------------------------------------------------------
// is_prime:
// ---------------------------------------------------------------------------
/** Trial division with the 6k +/- 1 stride.  Rejects 0 and 1 along with the
 * composites.
 */
pub fn is_prime(n: usize) -> bool {
    if n <= 1 {
        return false;
    }
    if n <= 3 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut i = 5;
    while i * i <= n {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

// ***************************************************************************
//                            Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// shuffle:
// ---------------------------------------------------------------------------
/** Seeded Fisher-Yates.  Walks i from the last position down to 1, draws j
 * uniformly from [0, i], and swaps.  The generator is consumed in a fixed
 * order, so the permutation depends only on the seed and the input order.
 */
fn shuffle(words: &mut [String], seed: u32) {
    let mut rng = ShuffleRng::new(seed);
    for i in (1..words.len()).rev() {
        let j = (rng.next_f64() * (i + 1) as f64) as usize;
        words.swap(i, j);
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    // Five words whose shuffle under seed 1234 is a known fixture.
    const FIVE_WORDS: &str = "alpha\nbravo\ncharlie\ndelta\necho\n";

    #[test]
    fn test_is_prime() {
        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(is_prime(2));
        assert!(is_prime(3));
        assert!(!is_prime(4));
        assert!(is_prime(5));
        assert!(!is_prime(9));
        assert!(!is_prime(25));
        assert!(is_prime(97));
        assert!(!is_prime(49_731));
        assert!(is_prime(370_103)); // size of a well-known alpha wordlist
    }

    #[test]
    fn test_filtering() {
        // Trimming, lowercasing, and alpha-only filtering, order preserved.
        let raw = "  Apple \nbanana\n123\ncafé\nfoo bar\nx1y\n\nCHERRY\n";
        let words = load_words(raw).expect("count should be prime");
        assert_eq!(words, vec!["apple", "banana", "cherry"]);
    }

    #[test]
    fn test_non_prime_count_rejected() {
        // Four survivors: composite, so construction must fail with the count.
        let raw = "aa\nbb\ncc\ndd\n";
        match load_words(raw) {
            Err(Errors::NonPrimeWordCount(n)) => assert_eq!(n, 4),
            other => panic!("expected NonPrimeWordCount, got {:?}", other.map(|v| v.len())),
        }
        assert!(Dictionary::new(raw, DEFAULT_SHUFFLE_SEED).is_err());
    }

    #[test]
    fn test_empty_wordlist_rejected() {
        // Zero is not prime.
        assert!(load_words("").is_err());
        assert!(load_words("123\n!!\n").is_err());
    }

    #[test]
    fn test_rng_pinned_sequence() {
        // First raw outputs for seed 1234.  These values are frozen; if this
        // test fails, every deployed index changes meaning.
        let mut rng = ShuffleRng::new(1234);
        assert_eq!(rng.next_u32(), 3_112_186_583);
        assert_eq!(rng.next_u32(), 2_648_076_444);
        assert_eq!(rng.next_u32(), 428_646_200);
        assert_eq!(rng.next_u32(), 675_931_623);
    }

    #[test]
    fn test_rng_unit_interval() {
        let mut rng = ShuffleRng::new(99);
        for _ in 0..1000 {
            let r = rng.next_f64();
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn test_reference_shuffle_three_words() {
        // The conformance fixture: "Apple", "banana", "123", "cherry" with
        // seed 1234.  The first two draws land both swaps on themselves, so
        // the permutation is the identity.
        let dict = Dictionary::new("Apple\nbanana\n123\ncherry", 1234).unwrap();
        assert_eq!(dict.size(), 3);
        assert_eq!(dict.get_index("apple").unwrap(), 0);
        assert_eq!(dict.get_index("banana").unwrap(), 1);
        assert_eq!(dict.get_index("cherry").unwrap(), 2);
    }

    #[test]
    fn test_reference_shuffle_five_words() {
        let dict = Dictionary::new(FIVE_WORDS, 1234).unwrap();
        assert_eq!(dict.get_word(0).unwrap(), "bravo");
        assert_eq!(dict.get_word(1).unwrap(), "echo");
        assert_eq!(dict.get_word(2).unwrap(), "alpha");
        assert_eq!(dict.get_word(3).unwrap(), "charlie");
        assert_eq!(dict.get_word(4).unwrap(), "delta");
    }

    #[test]
    fn test_reference_shuffle_seven_words() {
        let dict =
            Dictionary::new("ant\nbee\ncat\ndog\neel\nfox\ngnu\n", 42).unwrap();
        let order: Vec<&str> = (0..7).map(|i| dict.get_word(i).unwrap()).collect();
        assert_eq!(order, vec!["dog", "bee", "eel", "cat", "fox", "gnu", "ant"]);
    }

    #[test]
    fn test_determinism() {
        let a = Dictionary::new(FIVE_WORDS, 1234).unwrap();
        let b = Dictionary::new(FIVE_WORDS, 1234).unwrap();
        for i in 0..a.size() {
            assert_eq!(a.get_word(i).unwrap(), b.get_word(i).unwrap());
        }

        // A different seed rearranges this list.
        let c = Dictionary::new(FIVE_WORDS, 4321).unwrap();
        let same = (0..a.size()).all(|i| a.get_word(i).unwrap() == c.get_word(i).unwrap());
        assert!(!same);
    }

    #[test]
    fn test_bijection() {
        let dict = Dictionary::new(DEFAULT_WORDLIST, DEFAULT_SHUFFLE_SEED).unwrap();
        for i in 0..dict.size() {
            let w = dict.get_word(i).unwrap().to_string();
            assert_eq!(dict.get_index(&w).unwrap(), i);
        }
        for line in DEFAULT_WORDLIST.lines() {
            let i = dict.get_index(line).unwrap();
            assert_eq!(dict.get_word(i).unwrap(), line);
        }
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let dict = Dictionary::new(FIVE_WORDS, 1234).unwrap();
        assert!(dict.has_word("alpha"));
        assert!(dict.has_word("Alpha"));
        assert!(dict.has_word("ALPHA"));
        assert!(!dict.has_word("omega"));
        assert_eq!(
            dict.get_index("BRAVO").unwrap(),
            dict.get_index("bravo").unwrap()
        );
    }

    #[test]
    fn test_not_found_is_typed() {
        let dict = Dictionary::new(FIVE_WORDS, 1234).unwrap();
        match dict.get_index("zulu") {
            Err(Errors::WordNotFound(w)) => assert_eq!(w, "zulu"),
            other => panic!("expected WordNotFound, got {:?}", other.ok()),
        }
        // One past the last valid index.
        match dict.get_word(dict.size()) {
            Err(Errors::IndexNotFound(i)) => assert_eq!(i, 5),
            other => panic!("expected IndexNotFound, got {:?}", other.ok()),
        }
    }

    #[test]
    fn test_default_wordlist_is_prime() {
        let words = load_words(DEFAULT_WORDLIST).expect("shipped wordlist must be prime-sized");
        assert!(is_prime(words.len()));
    }
}
