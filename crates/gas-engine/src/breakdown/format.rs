/// Renders display currency amounts.
pub trait FeeFormatter {
    fn format_fiat(&self, value: f64) -> String;
}

/// USD gas price formatting: `$0.00`, `<$0.01`, `$1,234.56`, `$1.23M`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FiatGasPriceFormatter;

impl FeeFormatter for FiatGasPriceFormatter {
    fn format_fiat(&self, value: f64) -> String {
        if !value.is_finite() || value < 0.0 {
            return "-".to_string();
        }
        if value == 0.0 {
            return "$0.00".to_string();
        }
        if value < 0.01 {
            return "<$0.01".to_string();
        }

        // Tiers are picked on the rounded amount so 999,999.996 reads as $1.00M
        let cents = (value * 100.0).round() / 100.0;
        if cents < 1e6 {
            return format!("${}", group_thousands(&format!("{:.2}", cents)));
        }

        for (scale, suffix) in [(1e6, "M"), (1e9, "B")] {
            let scaled = (value / scale * 100.0).round() / 100.0;
            if scaled < 1000.0 {
                return format!("${:.2}{}", scaled, suffix);
            }
        }
        format!("${:.2}T", value / 1e12)
    }
}

fn group_thousands(fixed: &str) -> String {
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed, ""));

    let mut grouped = String::with_capacity(fixed.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if fraction.is_empty() {
        grouped
    } else {
        format!("{}.{}", grouped, fraction)
    }
}
