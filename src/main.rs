#![forbid(unsafe_code)]

use lazy_static::lazy_static;
use log::info;
use poem::{listener::TcpListener, Route};
use poem_openapi::{payload::PlainText, OpenApi, OpenApiService};

// Wordpage utilities.
use crate::v1::pages::page_get::GetPageApi;
use crate::v1::pages::version::VersionApi;
use crate::utils::config::{init_log, init_runtime_context, RuntimeCtx, WP_ARGS, WP_DIRS};
use crate::utils::errors::Errors;

// Modules
mod utils;
mod v1;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const SERVER_NAME : &str = "WordpageServer"; // for poem logging

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Lazily initialize the runtime context so that it has a 'static lifetime.
// Construction reads the input parameters and builds the word dictionary;
// a wordlist with a non-prime word count aborts the process here, before
// the listener ever starts.
lazy_static! {
    static ref RUNTIME_CTX: RuntimeCtx = init_runtime_context();
}

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    // --------------- Initialize Wordpage ------------
    // Announce ourselves.
    println!("Starting wordpage_server!");

    // Initialize the server.
    wp_init();

    // Nothing else to do when only the data directories were requested.
    if WP_ARGS.create_dirs_only {
        println!("Data directories created under {}.", WP_DIRS.root_dir);
        return Ok(());
    }

    // --------------- Main Loop Set Up ---------------
    // Assign base URL.
    let wp_url = format!("{}:{}",
        RUNTIME_CTX.parms.config.http_addr,
        RUNTIME_CTX.parms.config.http_port);

    // Create a tuple with all the endpoint structs.
    let endpoints = (StatusApi, GetPageApi, VersionApi);
    let api_service =
        OpenApiService::new(endpoints, "Wordpage Server", "0.1.0").server(wp_url);

    // Allow the generated openapi specs to be retrieved from the server.
    let spec = api_service.spec_endpoint();
    let spec_yaml = api_service.spec_endpoint_yaml();

    // Create the routes and run the server.
    let addr = format!("{}{}", "0.0.0.0:", RUNTIME_CTX.parms.config.http_port);
    let ui = api_service.swagger_ui();
    let app = Route::new()
        .nest("/docs", ui)
        .at("/spec", spec)
        .at("/spec_yaml", spec_yaml)
        .nest("/", api_service);

    // ------------------ Main Loop -------------------
    poem::Server::new(TcpListener::bind(addr))
        .name(SERVER_NAME)
        .run(app)
        .await
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// wp_init:
// ---------------------------------------------------------------------------
/** Initialize all subsystems and data structures other than those needed
 * to configure the main loop processor.
 */
fn wp_init() {
    // Configure our log.
    init_log();

    // Force the reading of input parameters and initialization of the runtime
    // context, which also builds the word dictionary used by all handlers.
    info!("{}", Errors::InputParms(format!("{:#?}", RUNTIME_CTX.parms)));
    info!("Serving {} words.", RUNTIME_CTX.dictionary.size());

    // Log build info.
    print_version_info();
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
fn print_version_info() {
    // Log build info.
    info!("{}.", format!("\n*** Running WORDPAGE={}, BRANCH={}, COMMIT={}, DIRTY={}, SRC_TS={}, RUSTC={}",
                        option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
                        env!("GIT_BRANCH"),
                        env!("GIT_COMMIT_SHORT"),
                        env!("GIT_DIRTY"),
                        env!("SOURCE_TIMESTAMP"),
                        env!("RUSTC_VERSION")),
    );
}

// ***************************************************************************
//                             Status Endpoint
// ***************************************************************************
// Status structure.
struct StatusApi;

// ---------------------------------------------------------------------------
// status endpoint:
// ---------------------------------------------------------------------------
#[OpenApi]
impl StatusApi {
    #[oai(path = "/status", method = "get")]
    async fn status(&self) -> PlainText<String> {
        PlainText(format!("ready: dictionary holds {} words", RUNTIME_CTX.dictionary.size()))
    }
}
