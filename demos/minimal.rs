//! demos/minimal.rs
//! A minimal example to exercise the spreadsheet engine

use gridcalc_core::{new_sheet, Position};
use std::io;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut sheet = new_sheet();

    let a1 = Position::from_a1("A1").ok_or("bad position")?;
    let b1 = Position::from_a1("B1").ok_or("bad position")?;
    let c1 = Position::from_a1("C1").ok_or("bad position")?;

    sheet.set(a1, "price")?;
    sheet.set(b1, "2.5")?;
    sheet.set(c1, "=B1*4")?;

    println!("Texts:");
    sheet.print_texts(&mut io::stdout())?;

    println!("Values:");
    sheet.print_values(&mut io::stdout())?;

    let size = sheet.printable_size();
    println!("Printable size: {} x {}", size.rows, size.cols);

    Ok(())
}
