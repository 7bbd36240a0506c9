#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "powchain CLI".bright_cyan().bold());
    println!("{}", "------------".bright_cyan());
    println!();
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!("  - {}", "powchain-api".bright_white());
    println!("  - {}", "powchain-mine".bright_white());
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!("{}", "  cargo run --bin powchain-api -- --port 5000".italic());
}
