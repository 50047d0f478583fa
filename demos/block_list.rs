//! Block List Example
//!
//! Drives a `[100, 500, 200, 300, 600]` block partition by hand: First Fit
//! for three processes, a free, then Best Fit and Worst Fit. Blocks are
//! never split, so every allocation wastes the tail of its block.
//!
//! # Run
//!
//! ```bash
//! cargo run --example block_list
//! ```

use fitsim::block_list::{BlockId, BlockList, BlockListConfig};
use fitsim::fragmentation::analyze;
use fitsim::process::ProcessId;
use fitsim::strategy::Strategy;

fn show(memory: &BlockList) {
    let blocks: Vec<String> = memory.blocks().iter().map(ToString::to_string).collect();
    println!("Memory: {}", blocks.join(" "));
    let stats = memory.stats();
    println!(
        "  Used: {}/{} ({:.1}%), internal waste: {}\n",
        stats.allocated_units,
        stats.capacity,
        stats.utilization() * 100.0,
        stats.internal_fragmentation
    );
}

fn request(memory: &mut BlockList, strategy: Strategy, id: u32, size: usize) {
    match strategy.place(memory, size) {
        Some(block) => {
            let owner = ProcessId::new(id);
            match memory.allocate(BlockId::new(block), owner, size) {
                Ok(()) => println!(
                    "  {owner} ({size}) -> block {block} of {}",
                    memory.blocks()[block].size
                ),
                Err(e) => println!("  {owner} rejected: {e}"),
            }
        }
        None => println!("  No space for P{id} ({size}): {}", analyze(memory, size)),
    }
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    println!("=== Block List Demo ===\n");

    let mut memory = BlockList::with_config(BlockListConfig::classic()).expect("valid partition");
    show(&memory);

    println!("--- First Fit ---");
    request(&mut memory, Strategy::FirstFit, 1, 212);
    request(&mut memory, Strategy::FirstFit, 2, 417);
    request(&mut memory, Strategy::FirstFit, 3, 112);
    request(&mut memory, Strategy::FirstFit, 4, 426);
    show(&memory);

    println!("--- Free ---");
    match memory.free(ProcessId::new(2)) {
        Ok(block) => println!("  P2 freed block {}", block.index()),
        Err(e) => println!("  {e}"),
    }
    if let Err(e) = memory.free(ProcessId::new(9)) {
        println!("  {e}");
    }
    show(&memory);

    println!("--- Best Fit ---");
    request(&mut memory, Strategy::BestFit, 4, 350);
    show(&memory);

    println!("--- Worst Fit ---");
    request(&mut memory, Strategy::WorstFit, 5, 210);
    show(&memory);

    println!("--- Quick Fit (size classes) ---");
    let mut fresh = BlockList::with_config(BlockListConfig::classic()).expect("valid partition");
    println!(
        "  {} size classes across {} blocks",
        fresh.quick_fit_index().num_classes(),
        fresh.len()
    );
    request(&mut fresh, Strategy::QuickFit, 6, 300);
    request(&mut fresh, Strategy::QuickFit, 7, 250);
    request(&mut fresh, Strategy::QuickFit, 8, 150);
    show(&fresh);

    println!("--- Coalescing on free ---");
    let config = BlockListConfig::with_sizes([100, 100, 100]).coalesce_on_free(true);
    let mut merging = BlockList::with_config(config).expect("valid partition");
    request(&mut merging, Strategy::FirstFit, 1, 100);
    request(&mut merging, Strategy::FirstFit, 2, 100);
    let _ = merging.free(ProcessId::new(2));
    request(&mut merging, Strategy::FirstFit, 3, 180);
    show(&merging);
}
