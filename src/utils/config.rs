#![forbid(unsafe_code)]

use anyhow::{Result, anyhow};
use log::{info, error};
use serde::Deserialize;
use std::{env, fs, path::Path};
use std::os::unix::fs::PermissionsExt;
use fs_mistrust::Mistrust;
use lazy_static::lazy_static;
use structopt::StructOpt;
use toml;

// Wordpage utilities.
use crate::utils::errors::Errors;
use crate::utils::dictionary::{Dictionary, DEFAULT_WORDLIST, DEFAULT_SHUFFLE_SEED};
use crate::utils::wp_utils::get_absolute_path;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Directory and file locations. Unless otherwise noted, all files and directories
// are relative to the root directory.
const ENV_WORDPAGE_ROOT_DIR : &str = "WORDPAGE_ROOT_DIR";
const DEFAULT_ROOT_DIR      : &str = "~/.wordpage";
const CONFIG_DIR            : &str = "/config";
const LOGS_DIR              : &str = "/logs";
const LOG4RS_CONFIG_FILE    : &str = "/log4rs.yml";      // relative to config dir
const WORDPAGE_CONFIG_FILE  : &str = "/wordpage.toml";   // relative to config dir

// Networking.
const DEFAULT_HTTP_ADDR     : &str = "http://localhost";
const DEFAULT_HTTP_PORT     : u16  = 3000;

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Assign the command line arguments BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref WP_ARGS: WpArgs = init_wp_args();
}

// Calculate the data directories BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref WP_DIRS: WpDirs = init_wp_dirs();
}

// ***************************************************************************
//                             Directory Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// WpDirs:
// ---------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct WpDirs {
    pub root_dir: String,
    pub config_dir: String,
    pub logs_dir: String,
}

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// CommandLineArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, StructOpt)]
#[structopt(name = "wordpage_args", about = "Command line arguments for the wordpage server.")]
pub struct WpArgs {
    /// Specify the server's root data directory.
    ///
    /// This directory contains the configuration and log files the server
    /// uses during execution.
    #[structopt(short, long)]
    pub root_dir: Option<String>,

    /// Create the data directories and then exit.
    ///
    /// The data directories will be rooted at a root directory calculated
    /// using the following priority order:
    ///
    ///   1. If set, the value of the WORDPAGE_ROOT_DIR environment,
    ///
    ///   2. Otherwise, if set, the value of the --root_dir command line argument,
    ///
    ///   3. Otherwise, ~/.wordpage
    ///
    #[structopt(short, long)]
    pub create_dirs_only: bool,
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
#[allow(dead_code)]
pub struct Parms {
    pub config_file: String,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
/** Everything the handlers need, built once before the listener starts.
 * The dictionary is logically immutable after this point, so concurrent
 * request handlers read it without locking.
 */
pub struct RuntimeCtx {
    pub parms: Parms,
    pub dictionary: Dictionary,
    pub wp_args: &'static WpArgs,
    pub wp_dirs: &'static WpDirs,
}

// ---------------------------------------------------------------------------
// Config:
// ---------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub http_addr: String,
    pub http_port: u16,
    /// Path to a newline-delimited wordlist; empty selects the wordlist
    /// compiled into the binary.
    pub wordlist_file: String,
    /// Seed for the dictionary shuffle.  Assigned indices are only stable
    /// across restarts while this value is unchanged.
    pub shuffle_seed: u32,
}

impl Config {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Config::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Wordpage Server".to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            wordlist_file: String::new(),
            shuffle_seed: DEFAULT_SHUFFLE_SEED,
        }
    }
}

// ***************************************************************************
//                            Directory Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_wp_args:
// ---------------------------------------------------------------------------
/** Get the command line arguments. */
fn init_wp_args() -> WpArgs {
    let args = WpArgs::from_args();
    println!("{:?}", args);
    args
}

// ---------------------------------------------------------------------------
// init_wp_dirs:
// ---------------------------------------------------------------------------
/** Calculate the external data directories. */
fn init_wp_dirs() -> WpDirs {
    // Initialize the mistrust object.
    let mistrust = get_mistrust();

    // Check that each path is absolute and is a directory with the
    // proper permission assign if it exists.  If it doesn't exist,
    // create it.
    let root_dir = get_root_dir();
    check_wp_dir(&root_dir, "root directory", &mistrust);

    let config_dir = root_dir.clone() + CONFIG_DIR;
    check_wp_dir(&config_dir, "config directory", &mistrust);

    let logs_dir = root_dir.clone() + LOGS_DIR;
    check_wp_dir(&logs_dir, "logs directory", &mistrust);

    // Package up and return the directories.
    WpDirs { root_dir, config_dir, logs_dir }
}

// ---------------------------------------------------------------------------
// check_wp_dir:
// ---------------------------------------------------------------------------
/** Check that the path is absolute and, if it exists, that is has the proper
 * permissions assigned.  If it doesn't exist, create it.  The mistrust package
 * creates directories with 0o700 permissions.
 *
 * Any failure results in a panic.
 */
fn check_wp_dir(dir: &String, msgname: &str, mistrust: &Mistrust) {
    // Get the path object.
    let path = Path::new(dir);
    if !path.is_absolute() {
        panic!("The wordpage {} path must be absolute: {}", msgname, dir);
    }
    if path.exists() {
        // Make sure the path represents a directory.
        if !path.is_dir() {
            panic!("The wordpage {} path must be a directory: {}", msgname, dir);
        }

        // Make sure the directory had rwx for owner only.
        let meta = path.metadata().unwrap_or_else(|_| panic!("Unable to read metadata for {}: {}", msgname, dir));
        let perm = meta.permissions().mode();
        if perm & 0o777 != 0o700 {
            panic!("The wordpage {} path must be have 0o700 permissions: {}", msgname, dir);
        }
    } else {
        // Create the directory with the correct permissions.
        match mistrust.make_directory(path) {
            Ok(_) => (),
            Err(e) => {
                panic!("Make directory error for {:?}: {}", path, &e.to_string());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// get_mistrust:
// ---------------------------------------------------------------------------
/** Configure a new mistrust object for initial directory processing. */
fn get_mistrust() -> Mistrust {
    // Configure our mistrust object.
    let mistrust = match Mistrust::builder()
        .ignore_prefix(get_absolute_path("~"))
        .trust_group(0)
        .build() {
            Ok(m) => m,
            Err(e) => {
                panic!("Mistrust configuration error: {}", &e.to_string());
            }
        };
    mistrust
}

// ---------------------------------------------------------------------------
// get_root_dir:
// ---------------------------------------------------------------------------
fn get_root_dir() -> String {
    // Order of precedence:
    //  1. Environment variable
    //  2. Command line --root-dir argument
    //  3. Default location
    //
    let root_dir = env::var(ENV_WORDPAGE_ROOT_DIR).unwrap_or_else(
        |_| {
            match WP_ARGS.root_dir.clone() {
                Some(r) => r,
                None => DEFAULT_ROOT_DIR.to_string(),
            }
        });

    // Canonicalize the path.
    get_absolute_path(&root_dir)
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
pub fn init_log() {
    // Initialize log4rs logging from the configuration file when present,
    // otherwise log to the console so an empty root directory still works.
    let logconfig = init_log_config();
    if Path::new(&logconfig).is_file() {
        match log4rs::init_file(logconfig.clone(), Default::default()) {
            Ok(_) => (),
            Err(e) => {
                println!("{}", e);
                let s = format!("{}", Errors::Log4rsInitialization(logconfig.clone()));
                panic!("{}", s);
            },
        }
        info!("Log4rs initialized using: {}", logconfig);
    } else {
        init_console_log();
        info!("No Log4rs configuration at {}; logging to the console.", logconfig);
    }
}

// ---------------------------------------------------------------------------
// init_console_log:
// ---------------------------------------------------------------------------
fn init_console_log() {
    use log4rs::append::console::ConsoleAppender;
    use log4rs::config::{Appender, Config as LogConfig, Root};

    let stdout = ConsoleAppender::builder().build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(log::LevelFilter::Info))
        .expect("FAILED to assemble the default log configuration.");
    log4rs::init_config(config).expect("FAILED to initialize console logging.");
}

// ---------------------------------------------------------------------------
// init_log_config:
// ---------------------------------------------------------------------------
fn init_log_config() -> String {
    WP_DIRS.config_dir.clone() + LOG4RS_CONFIG_FILE
}

/// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Retrieve the application parameters from the configuration file in the
 * config data directory.  If the file is missing, default values are used.
 */
fn get_parms() -> Result<Parms> {
    // Get the config file path from its data directory.
    let config_file = WP_DIRS.config_dir.clone() + WORDPAGE_CONFIG_FILE;

    // Read the cofiguration file.
    let config_file_abs = get_absolute_path(&config_file);
    info!("{}", Errors::ReadingConfigFile(config_file_abs.clone()));
    let contents = match fs::read_to_string(&config_file_abs) {
        Ok(c) => c,
        Err(_) => {
            println!("Unable to read configuration at {}. Using default values.", config_file);
            return Ok(Parms { config_file: Default::default(), config: Config::new() });
        }
    };

    // Parse the toml configuration.
    let config : Config = match toml::from_str(&contents) {
        Ok(c)  => c,
        Err(e) => {
            let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file_abs), e);
            error!("{}", msg);
            return Result::Err(anyhow!(msg));
        }
    };

    Ok(Parms { config_file: config_file_abs, config })
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
pub fn init_runtime_context() -> RuntimeCtx {
    // If either of these fail the application aborts.  A non-prime wordlist
    // is a configuration error; there is nothing to retry.
    let parms = get_parms().expect("FAILED to read configuration file.");
    let dictionary = init_dictionary(&parms.config)
        .expect("FAILED to build the word dictionary.");
    RuntimeCtx { parms, dictionary, wp_args: &WP_ARGS, wp_dirs: &WP_DIRS }
}

// ---------------------------------------------------------------------------
// init_dictionary:
// ---------------------------------------------------------------------------
/** Build the process-lifetime dictionary from the configured wordlist file,
 * or from the compiled-in wordlist when no file is configured.
 */
fn init_dictionary(config: &Config) -> Result<Dictionary, Errors> {
    let dictionary = if config.wordlist_file.is_empty() {
        Dictionary::new(DEFAULT_WORDLIST, config.shuffle_seed)?
    } else {
        let path = get_absolute_path(&config.wordlist_file);
        Dictionary::from_file(&path, config.shuffle_seed)?
    };
    info!("Dictionary ready with {} words.", dictionary.size());
    Ok(dictionary)
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use crate::utils::config::Config;
    use crate::utils::dictionary::DEFAULT_SHUFFLE_SEED;

    #[test]
    fn print_config() {
        println!("{:?}", Config::new());
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::new();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.shuffle_seed, DEFAULT_SHUFFLE_SEED);
        assert!(config.wordlist_file.is_empty());
    }

    #[test]
    fn test_config_partial_toml() {
        // Unspecified fields fall back to defaults.
        let config: Config = toml::from_str("http_port = 8080\nshuffle_seed = 7\n")
            .expect("valid toml");
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.shuffle_seed, 7);
        assert_eq!(config.http_addr, "http://localhost");
    }
}
