use getappt::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = cli::run().await {
        eprintln!("Error: {:#}", err);
        if let Some(hint) = cli::user_hint(&err) {
            eprintln!("{}", hint);
        }
        std::process::exit(1);
    }
}
