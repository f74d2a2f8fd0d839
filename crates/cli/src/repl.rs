//! Interactive shell: reads whitespace-separated commands from stdin and
//! dispatches them the same way the non-interactive subcommands do.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use engine::Node;

use crate::args::Command;
use crate::commands;

enum Line {
    Blank,
    Exit,
    Command(Result<Command, String>),
}

fn parse_line(line: &str) -> Line {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else { return Line::Blank };
    let cmd = cmd.to_ascii_uppercase();
    let rest: Vec<&str> = parts.collect();

    if cmd == "EXIT" || cmd == "QUIT" {
        return Line::Exit;
    }

    Line::Command(match cmd.as_str() {
        "PUT" | "SET" => match rest.as_slice() {
            [row, value] => Ok(Command::Put { row: row.to_string(), value: value.to_string() }),
            _ => Err("usage: PUT <row> <value>".to_string()),
        },
        "GET" => match rest.as_slice() {
            [row] => Ok(Command::Get { row: row.to_string() }),
            _ => Err("usage: GET <row>".to_string()),
        },
        "DEL" | "DELETE" => match rest.as_slice() {
            [row] => Ok(Command::Delete { row: row.to_string() }),
            _ => Err("usage: DEL <row>".to_string()),
        },
        "SCAN" => Ok(Command::Scan { start: rest.first().map(|s| s.to_string()), end: rest.get(1).map(|s| s.to_string()) }),
        "FLUSH" => Ok(Command::Flush),
        "COMPACT" => Ok(Command::Compact { major: rest.first().is_some_and(|a| a.eq_ignore_ascii_case("major")) }),
        "SPLIT" => match rest.as_slice() {
            [key] => Ok(Command::Split { key: key.to_string() }),
            _ => Err("usage: SPLIT <key>".to_string()),
        },
        "STATUS" => Ok(Command::Status),
        other => Err(format!("unknown command: {other}")),
    })
}

pub fn run(node: &Node) -> Result<()> {
    println!("riptide-cli REPL — PUT/GET/DEL/SCAN/FLUSH/COMPACT/SPLIT/STATUS, EXIT to quit");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match parse_line(&line) {
            Line::Blank => {}
            Line::Exit => {
                println!("bye");
                break;
            }
            Line::Command(Ok(command)) => {
                if let Err(e) = commands::run(node, command) {
                    println!("ERR {e}");
                }
            }
            Line::Command(Err(usage)) => println!("ERR {usage}"),
        }
        print!("> ");
        io::stdout().flush().ok();
    }
    Ok(())
}
