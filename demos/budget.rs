//! demos/budget.rs
//! A small budget table whose total recomputes when an input changes

use gridcalc_core::{new_sheet, Position, Sheet};
use std::io;

fn set(sheet: &mut Sheet, a1: &str, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pos = Position::from_a1(a1).ok_or("bad position")?;
    sheet.set(pos, text)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut sheet = new_sheet();

    set(&mut sheet, "A1", "Item")?;
    set(&mut sheet, "B1", "Amount")?;
    set(&mut sheet, "A2", "Rent")?;
    set(&mut sheet, "B2", "1200")?;
    set(&mut sheet, "A3", "Food")?;
    set(&mut sheet, "B3", "450")?;
    set(&mut sheet, "A4", "Transport")?;
    set(&mut sheet, "B4", "160")?;
    set(&mut sheet, "A5", "Total")?;
    set(&mut sheet, "B5", "=B2+B3+B4")?;

    println!("Budget:");
    sheet.print_values(&mut io::stdout())?;

    // Updating one input invalidates the memoized total.
    println!();
    println!("After a rent increase:");
    set(&mut sheet, "B2", "1350")?;
    sheet.print_values(&mut io::stdout())?;

    Ok(())
}
