#![forbid(unsafe_code)]
//! Mine a block on a throwaway in-memory ledger and print the result.
//!
//! Usage: powchain-mine <sender> <recipient> <amount> [difficulty]

use colored::*;
use std::env;
use std::time::Instant;
use powchain::blockchain::{Blockchain, DEFAULT_MINING_REWARD};
use powchain::miner::{ProofOfWork, DEFAULT_DIFFICULTY};

fn usage(args: &[String]) -> String {
    let program = args.first().map(String::as_str).unwrap_or("powchain-mine");
    format!("Usage: {} <sender> <recipient> <amount> [difficulty]", program)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("{}", usage(&args));
        return Ok(());
    }

    let amount: f64 = args[3].parse()?;
    let difficulty = match args.get(4) {
        Some(d) => d.parse()?,
        None => DEFAULT_DIFFICULTY,
    };
    let pow = ProofOfWork::new(difficulty)?;

    let mut chain = Blockchain::new();
    let index = chain.new_transaction(args[1].as_str(), args[2].as_str(), amount)?;
    println!("{} {}", "Transaction will be added to Block".bright_cyan(), index);

    let start_time = Instant::now();
    let block = chain.mine(&pow, "local-miner", DEFAULT_MINING_REWARD)?.clone();
    let elapsed = start_time.elapsed();

    println!("{}", "BLOCK MINED".bright_green().bold());
    println!("  Index:         {}", block.index);
    println!("  Hash:          {}", block.hash());
    println!("  Previous:      {}", block.previous_hash);
    println!("  Timestamp:     {}", block.timestamp);
    println!("  Proof:         {}", block.proof);
    println!("  Difficulty:    {}", pow.difficulty());
    println!("  Mining Time:   {:.3} seconds", elapsed.as_secs_f64());
    println!("  Transactions:");
    for tx in &block.transactions {
        println!("    {} -> {}: {}", tx.sender, tx.recipient, tx.amount);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_without_program_name() {
        assert!(usage(&[]).starts_with("Usage: powchain-mine "));
        assert!(usage(&["./mine".to_string()]).starts_with("Usage: ./mine "));
    }
}
