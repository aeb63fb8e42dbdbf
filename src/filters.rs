//! Askama display filters shared by the templates.

/// Brazilian currency body: `89.9` → `"89,90"`. The `R$` prefix stays in
/// the template.
pub fn brl(value: &f64) -> askama::Result<String> {
    Ok(format!("{value:.2}").replace('.', ","))
}

/// `HH:MM:SS` or `HH:MM` → `HH:MM`.
pub fn hm(value: &str) -> askama::Result<String> {
    Ok(value.chars().take(5).collect())
}

/// `YYYY-MM-DD` → `DD/MM/YYYY`; anything else passes through untouched.
pub fn datebr(value: &str) -> askama::Result<String> {
    let mut parts = value.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(year), Some(month), Some(day)) if year.len() == 4 => {
            Ok(format!("{day}/{month}/{year}"))
        }
        _ => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_uses_comma_decimals() {
        assert_eq!(brl(&89.9).unwrap(), "89,90");
        assert_eq!(brl(&0.0).unwrap(), "0,00");
        assert_eq!(brl(&1234.567).unwrap(), "1234,57");
    }

    #[test]
    fn times_are_trimmed_to_hours_and_minutes() {
        assert_eq!(hm("14:30:00").unwrap(), "14:30");
        assert_eq!(hm("14:30").unwrap(), "14:30");
        assert_eq!(hm("").unwrap(), "");
    }

    #[test]
    fn dates_render_in_brazilian_order() {
        assert_eq!(datebr("2026-08-07").unwrap(), "07/08/2026");
        assert_eq!(datebr("hoje").unwrap(), "hoje");
    }
}
