//
//  Sample application for the warp framework glue.
//
//  Build with --features warp-compat.
//

use std::net::SocketAddr;

#[tokio::main]
async fn main() {
    env_logger::init();

    let dir = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let addr: SocketAddr = ([127, 0, 0, 1], 4918).into();

    println!("Serving {} on {}", dir, addr);
    warp::serve(davroot::warp::dav_dir(&dir)).run(addr).await;
}
