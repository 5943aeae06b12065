//! The interactive read-eval-print loop.

use std::net::SocketAddr;

use colored::Colorize;
use monodb_client::Client;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Runs the REPL until the user quits or closes stdin. `.quit`/`.exit` end
/// the session; anything else is sent to the server verbatim as a
/// statement line.
pub async fn run(mut client: Client, server: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    println!("monodb-cli connecting to {server}");
    println!("Type a statement, or .quit to exit.");

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("monodb> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}", format!("readline error: {e}").red());
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(trimmed);

        if trimmed == ".quit" || trimmed == ".exit" {
            break;
        }
        if trimmed == ".help" {
            println!("Statements look like: TELL users TO ADD RECORD WITH id = 1");
            println!(".quit / .exit to leave the REPL.");
            continue;
        }

        match client.query(trimmed).await {
            Ok(reply) if reply.starts_with("ERROR:") => println!("{}", reply.red()),
            Ok(reply) => println!("{}", reply.green()),
            Err(e) => eprintln!("{}", format!("connection error: {e}").red()),
        }
    }

    println!("bye");
    Ok(())
}
