use duty_roster::web::start_server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args: Vec<String> = std::env::args().collect();
    let port = args
        .get(1)
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);
    let data_dir = args.get(2).cloned().unwrap_or_else(|| ".".to_string());

    println!("Starting duty roster server on port {}...", port);
    println!("Artifacts stored under {}", data_dir);
    println!("Access the API at http://localhost:{}", port);

    start_server(port, data_dir.into()).await?;
    Ok(())
}
