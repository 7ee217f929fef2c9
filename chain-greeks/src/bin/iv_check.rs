//! Single-quote implied volatility check.
//!
//! Inverts one option price with both solvers and prints the Greeks at the
//! bisection volatility. Useful for spot-checking rows of a generated file.
//!
//! # Usage
//!
//! ```bash
//! iv-check --spot 100 --strike 100 --rate 0.01 --time 0.0822 --price 5.10
//! iv-check --spot 100 --strike 105 --rate 0.01 --time 0.25 --price 6.40 --put
//! ```

use anyhow::{bail, Result};
use clap::Parser;

use chain_greeks::{BlackScholesPricer, OptionType};

const SEPARATOR: &str = "========================================";

#[derive(Parser)]
#[command(name = "iv-check")]
#[command(about = "Implied volatility and Greeks for a single option quote")]
struct Cli {
    /// Underlying price
    #[arg(long)]
    spot: f64,

    /// Strike price
    #[arg(long)]
    strike: f64,

    /// Continuously compounded risk-free rate
    #[arg(long, default_value_t = 0.01)]
    rate: f64,

    /// Time to expiry in years
    #[arg(long)]
    time: f64,

    /// Option market price
    #[arg(long)]
    price: f64,

    /// Treat the quote as a put
    #[arg(long)]
    put: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if !(cli.time > 0.0) {
        bail!("time to expiry must be positive, got {}", cli.time);
    }
    if !(cli.spot > 0.0 && cli.strike > 0.0) {
        bail!("spot and strike must be positive");
    }

    let opt_type = if cli.put { OptionType::Put } else { OptionType::Call };
    let pricer = BlackScholesPricer::default();

    let bisection =
        pricer.implied_vol_bisection(cli.spot, cli.strike, cli.rate, cli.time, cli.price, opt_type);
    let newton =
        pricer.implied_vol_newton(cli.spot, cli.strike, cli.rate, cli.time, cli.price, opt_type);

    println!("{}", SEPARATOR);
    println!(
        "{} S={} K={} r={} t={} price={}",
        opt_type, cli.spot, cli.strike, cli.rate, cli.time, cli.price
    );
    println!("{}", SEPARATOR);
    println!("  IV (bisection): {:.4}%", 100.0 * bisection);
    println!("  IV (newton):    {:.4}%", 100.0 * newton);

    if bisection.is_nan() {
        println!("\n  No volatility reproduces this price.");
        return Ok(());
    }

    let greeks = pricer.greeks(cli.spot, cli.strike, cli.rate, bisection, cli.time, opt_type);
    println!("\n  Delta: {:.6}", greeks.delta);
    println!("  Gamma: {:.6}", greeks.gamma);
    println!("  Vega:  {:.6}", greeks.vega);
    println!("  Theta: {:.6}", greeks.theta);
    println!("  Rho:   {:.6}", greeks.rho);

    Ok(())
}
