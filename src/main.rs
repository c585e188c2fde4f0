use std::io::{self, Write};

use log::{debug, info};

use likob::Database;
use likob::display::render;

const PROMPT: &str = "likob> ";
const BANNER: &str = "LikOb in-memory SQL engine. Type exit to quit.";

fn main() -> io::Result<()> {
    env_logger::init();
    info!("starting shell");
    println!("{}", BANNER);

    let mut db = Database::new();
    let stdin = io::stdin();
    loop {
        print!("{}", PROMPT);
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if [".exit", "exit", "quit"].iter().any(|c| trimmed.eq_ignore_ascii_case(c)) {
            break;
        }

        debug!("input: {}", trimmed);
        match db.execute(trimmed) {
            Ok(result) => {
                if let Some(text) = render(&result) {
                    println!("{}", text);
                }
            }
            Err(e) => println!("Error: {}", e),
        }
    }
    info!("shell closed");
    Ok(())
}
