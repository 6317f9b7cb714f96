//
//  Sample application.
//
//  Serves a local directory over WebDAV on plain http, no ssl.
//  Connect to http://localhost:4918/
//

use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::str::FromStr;

use clap::Parser;

use davroot::DavBuilder;

#[derive(Debug, clap::Parser)]
#[command(about, version)]
struct Cli {
    /// port to listen on
    #[arg(short, long, default_value = "4918")]
    port: u16,
    /// local directory to serve
    #[arg(short, long, default_value = ".")]
    dir: String,
    /// prefix to strip from request paths
    #[arg(long, default_value = "")]
    prefix: String,
    /// require basic authentication, given as user:password
    #[arg(short, long)]
    auth: Option<String>,
    /// realm reported in the authentication challenge
    #[arg(long, default_value = "WebDAV Server")]
    realm: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();

    let mut builder = DavBuilder::new(&cli.dir)
        .strip_prefix(cli.prefix.as_str())
        .realm(cli.realm.as_str());
    if let Some(auth) = &cli.auth {
        let (user, pass) = auth
            .split_once(':')
            .ok_or("auth must be given as user:password")?;
        let (user, pass) = (user.to_string(), pass.to_string());
        builder = builder.auth(move |u: &str, p: &str| {
            (u == user && p == pass).then(|| u.to_string())
        });
    }
    let dav_server = builder.build();

    let make_service = hyper::service::make_service_fn(move |_| {
        let dav_server = dav_server.clone();
        async move {
            let func = move |req| {
                let dav_server = dav_server.clone();
                async move { Ok::<_, Infallible>(dav_server.handle(req).await) }
            };
            Ok::<_, Infallible>(hyper::service::service_fn(func))
        }
    });

    let addr = SocketAddr::from_str(&format!("0.0.0.0:{}", cli.port))?;
    println!("Serving {} on {}", cli.dir, addr);
    hyper::Server::try_bind(&addr)?.serve(make_service).await?;
    Ok(())
}
