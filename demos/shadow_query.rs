//! Scoped query demonstration.
//!
//! Demonstrates:
//! - Connecting to a remote-debugging endpoint
//! - Querying through a closed shadow root
//! - Crossing an iframe in one selector
//! - Bounded concurrent queries
//! - Error handling for missing elements
//!
//! Usage:
//!   CDP_ENDPOINT=ws://127.0.0.1:9222/devtools/browser/ID \
//!     cargo run --example shadow_query -- --attach
//!   cargo run --example shadow_query -- ws://127.0.0.1:9222/devtools/page/ID
//!   cargo run --example shadow_query -- <endpoint> --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use cdp_scope::{By, Client, Error, Page, Result, WaitOptions};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const ENDPOINT_VAR: &str = "CDP_ENDPOINT";
const HOST_SELECTOR: &str = "#checkout";
const BUTTON_SELECTOR: &str = ".pay";
const FRAMED_SELECTOR: &str = "iframe#card input[name='number']";

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    endpoint: Option<String>,
    attach: bool,
    debug: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let endpoint = args
            .iter()
            .find(|a| !a.starts_with("--"))
            .cloned()
            .or_else(|| std::env::var(ENDPOINT_VAR).ok());

        Self {
            endpoint,
            attach: args.iter().any(|a| a == "--attach"),
            debug: args.iter().any(|a| a == "--debug"),
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "cdp_scope=debug"
    } else {
        "cdp_scope=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Scoped Query ===\n");

    // ========================================================================
    // Setup
    // ========================================================================

    let Some(endpoint) = args.endpoint else {
        return Err(Error::config(format!(
            "pass an endpoint argument or set {ENDPOINT_VAR}"
        )));
    };

    println!("[Setup] Connecting to {endpoint}...");
    let client = Client::builder()
        .endpoint(endpoint)
        .command_timeout(Duration::from_secs(10))
        .max_concurrency(4)
        .wait(WaitOptions::new(Duration::from_secs(5)))
        .connect()
        .await?;
    println!("        ✓ Connected ({client:?})\n");

    let page = if args.attach {
        attach_first_page(&client).await?
    } else {
        client.page()
    };

    // ========================================================================
    // Shadow root
    // ========================================================================

    println!("[1] {HOST_SELECTOR} -> shadow root -> {BUTTON_SELECTOR}");
    match page.find(HOST_SELECTOR).await {
        Ok(host) => {
            let root = host.wait_for_shadow_root().await?;
            println!("    ✓ Shadow root ({:?})", root.mode());

            let button = root.find(BUTTON_SELECTOR).await?;
            println!("    ✓ Found {}", button.outer_html().await?);
            button.click().await?;
            println!("    ✓ Clicked");
        }
        Err(e) if e.is_not_found() => println!("    - Skipped: {e}"),
        Err(e) => return Err(e),
    }
    println!();

    // ========================================================================
    // Frame crossing
    // ========================================================================

    println!("[2] find({FRAMED_SELECTOR})");
    match page.find(By::css(FRAMED_SELECTOR)).await {
        Ok(field) => {
            println!("    ✓ Found in session {}", field.session_id());
            println!("    tag: {}", field.tag_name().await?);
        }
        Err(e) if e.is_not_found() => println!("    - Skipped: {e}"),
        Err(e) => return Err(e),
    }
    println!();

    // ========================================================================
    // Capability check
    // ========================================================================

    println!("[3] XPath in a shadow scope");
    if let Ok(host) = page.find(HOST_SELECTOR).await
        && let Ok(root) = host.shadow_root().await
    {
        match root.find(By::xpath("//button")).await {
            Err(e) => println!("    ✓ Rejected locally: {e}"),
            Ok(_) => println!("    ✗ Unexpectedly matched"),
        }
    } else {
        println!("    - Skipped: no shadow host");
    }
    println!();

    // ========================================================================
    // Bounded concurrency
    // ========================================================================

    println!("[4] Concurrent counts");
    let selectors = ["a", "button", "input", "iframe"];
    let counts = futures_util::future::join_all(selectors.iter().map(|selector| {
        let client = client.clone();
        let page = page.clone();
        async move {
            client
                .run(async move { page.find_all(*selector).await.map(|all| all.len()) })
                .await
        }
    }))
    .await;

    for (selector, count) in selectors.iter().zip(counts) {
        println!("    {selector}: {}", count?);
    }
    println!();

    client.close();
    println!("=== Done ===");
    Ok(())
}

async fn attach_first_page(client: &Client) -> Result<Page> {
    let targets = client.targets().await?;
    let target = targets
        .iter()
        .find(|t| t.target_type == "page")
        .ok_or_else(|| Error::config("browser has no page targets"))?;

    println!("[Setup] Attaching to {} ({})", target.target_id, target.url);
    let page = client.attach_page(&target.target_id).await?;
    println!("        ✓ Session {}\n", page.session_id());
    Ok(page)
}
