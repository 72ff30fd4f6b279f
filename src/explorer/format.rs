use crate::dataset::Metric;

pub const CURRENCY_SYMBOL: &str = "₹";

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/**
 * Display text of a metric value, shared by summary cards, map popups and
 * chart labels.
 */
pub fn format_metric_value(value: f64, metric_name: &str) -> String {
    match metric_name {
        "rates_per_sqft" => {
            let rounded = format!("{:.0}", value.abs());
            let sign = if value < 0.0 && rounded.chars().any(|c| c != '0') { "-" } else { "" };
            format!("{}{}{}", CURRENCY_SYMBOL, sign, group_thousands(&rounded))
        }
        "rental_yields" => format!("{:.2}%", value * 100.0),
        _ => format!("{:.2}", value),
    }
}

impl Metric {
    pub fn format(&self, value: f64) -> String {
        format_metric_value(value, self.name())
    }
}
