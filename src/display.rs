use crate::types::{AnalysisResult, PricePoint};

fn print_row(point: &PricePoint) {
    let bound = |b: Option<f64>| b.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string());

    println!(
        "{:>10.2} {:>8} {:>10.4} {:>12.4} {:>10.4} {:>10} {:>10} {:>12} {:>12}",
        point.price,
        point.sample_count,
        point.demand,
        point.revenue,
        point.revenue_scaled,
        bound(point.demand_low),
        bound(point.demand_high),
        bound(point.revenue_low),
        bound(point.revenue_high),
    );
}

/// Display a preview of the analysis outcome
pub fn display_result(result: &AnalysisResult) {
    println!("\n{}", "=".repeat(110));
    println!("                                   DEMAND CURVE PREVIEW");
    println!("{}", "=".repeat(110));

    println!(
        "{:>10} {:>8} {:>10} {:>12} {:>10} {:>10} {:>10} {:>12} {:>12}",
        "Price", "N", "Demand", "Revenue", "RevScaled", "DemLow", "DemHigh", "RevLow", "RevHigh"
    );
    println!("{}", "-".repeat(110));

    for point in result.points.iter().take(10) {
        print_row(point);
    }
    if result.points.len() > 20 {
        println!("{:>10}", "...");
    }
    if result.points.len() > 10 {
        for point in result.points.iter().skip(result.points.len().max(20) - 10) {
            print_row(point);
        }
    }

    println!("{}", "=".repeat(110));
    println!("Aggregated price points: {}", result.points.len());
    println!("Effective sample size:   {}", result.effective_sample_size);
    println!(
        "Optimal price point:     {:.2} (revenue {:.4}, demand {:.4})",
        result.optimal.price, result.optimal.revenue, result.optimal.demand
    );
    match result.price_range {
        Some(range) => println!("Acceptable price range:  {:.2} - {:.2}", range.low, range.high),
        None => println!("Acceptable price range:  (not computed)"),
    }
    println!("{}", "=".repeat(110));
}
