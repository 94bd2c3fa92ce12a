const UNITS: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven",
    "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];
const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

const CRORE: u64 = 10_000_000;
const LAKH: u64 = 100_000;
const THOUSAND: u64 = 1_000;

fn below_hundred(n: u64) -> String {
    if n < 20 {
        UNITS[n as usize].to_string()
    } else if n % 10 == 0 {
        TENS[(n / 10) as usize].to_string()
    } else {
        format!("{} {}", TENS[(n / 10) as usize], UNITS[(n % 10) as usize])
    }
}

fn below_thousand(n: u64) -> String {
    if n < 100 {
        return below_hundred(n);
    }
    let hundreds = format!("{} Hundred", UNITS[(n / 100) as usize]);
    match n % 100 {
        0 => hundreds,
        rest => format!("{hundreds} and {}", below_hundred(rest)),
    }
}

fn spell(mut n: u64) -> Vec<String> {
    let mut words = Vec::new();
    if n >= CRORE {
        let crores = n / CRORE;
        let prefix = if crores < 100 {
            below_hundred(crores)
        } else {
            spell(crores).join(" ")
        };
        words.push(format!("{prefix} Crore"));
        n %= CRORE;
    }
    if n >= LAKH {
        words.push(format!("{} Lakh", below_hundred(n / LAKH)));
        n %= LAKH;
    }
    if n >= THOUSAND {
        words.push(format!("{} Thousand", below_hundred(n / THOUSAND)));
        n %= THOUSAND;
    }
    if n > 0 {
        words.push(below_thousand(n));
    }
    words
}

/// Whole rupees in Indian numbering, e.g. `125000` is
/// `One Lakh Twenty Five Thousand only`. Fractions are dropped.
pub fn money_in_words(amount: f64) -> String {
    if !amount.is_finite() || amount < 1.0 {
        return "Zero".to_string();
    }
    format!("{} only", spell(amount.trunc() as u64).join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indian_grouping() {
        assert_eq!(money_in_words(125000.0), "One Lakh Twenty Five Thousand only");
        assert_eq!(
            money_in_words(23_45_67_890.0),
            "Twenty Three Crore Forty Five Lakh Sixty Seven Thousand Eight Hundred and Ninety only"
        );
        assert_eq!(money_in_words(1000.0), "One Thousand only");
        assert_eq!(money_in_words(110.75), "One Hundred and Ten only");
    }

    #[test]
    fn zero_and_large_crores() {
        assert_eq!(money_in_words(0.0), "Zero");
        assert_eq!(money_in_words(1_500_000_000.0), "One Hundred and Fifty Crore only");
    }
}
