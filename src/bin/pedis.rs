/*!
 * pedis server main entry point
 *
 * Initializes logging, loads configuration from the environment, builds
 * the server — opening and replaying the AOF when enabled — and blocks
 * accepting connections.
 */

use anyhow::Result;
use pedis::{Server, ServerConfig};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    // Respects RUST_LOG, e.g. RUST_LOG=debug cargo run --release
    env_logger::init();

    let config = ServerConfig::from_env();
    let server = Server::bootstrap(&config)?;

    println!("pedis running on {}", config.bind_addr);
    server.run(config.bind_addr)?;
    Ok(())
}
