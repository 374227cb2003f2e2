//! Free-text ingredient line parsing.
//!
//! A line such as `"2 1/2 cups flour, chopped"` is split into a numeric count,
//! a recognised unit token and the remaining ingredient text. Parsing never
//! fails: anything that cannot be understood ends up in the ingredient text.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::models::Ingredient;

/// Known unit tokens, keyed by lower-case spelling, mapped to the token stored
/// on the parsed ingredient.
static UNIT_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("cup", "cup"),
        ("cups", "cups"),
        ("tbsp", "tbsp"),
        ("tbsps", "tbsp"),
        ("tablespoon", "tbsp"),
        ("tablespoons", "tbsp"),
        ("tsp", "tsp"),
        ("tsps", "tsp"),
        ("teaspoon", "tsp"),
        ("teaspoons", "tsp"),
        ("oz", "oz"),
        ("ounce", "oz"),
        ("ounces", "oz"),
        ("pound", "pound"),
        ("pounds", "pound"),
        ("lb", "lb"),
        ("lbs", "lb"),
        ("g", "g"),
        ("gram", "g"),
        ("grams", "g"),
        ("kg", "kg"),
        ("kilogram", "kg"),
        ("kilograms", "kg"),
        ("ml", "ml"),
        ("millilitre", "ml"),
        ("millilitres", "ml"),
        ("milliliter", "ml"),
        ("milliliters", "ml"),
        ("l", "l"),
        ("litre", "l"),
        ("litres", "l"),
        ("liter", "l"),
        ("liters", "l"),
    ])
});

/// Filler words dropped from the front of the ingredient text ("2 cups of flour").
const LEADING_FILLERS: &[&str] = &["of", "the", "a", "an"];

/// Denominators tried when rendering a count as a fraction.
const DISPLAY_DENOMINATORS: &[u32] = &[2, 3, 4, 8];
const DISPLAY_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
struct Quantity {
    value: f64,
    whole: bool,
}

/// Parse one raw ingredient line into `{count, unit, ingredient}`.
pub fn parse_ingredient(line: &str) -> Ingredient {
    let trimmed = line.trim();
    let cleaned = strip_parentheticals(trimmed);
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();

    let (count, consumed) = leading_count(&tokens);
    let mut rest = &tokens[consumed..];

    let mut unit = "";
    if let Some(first) = rest.first() {
        let candidate = first
            .trim_end_matches(['.', ','])
            .to_lowercase();
        if let Some(canonical) = UNIT_ALIASES.get(candidate.as_str()) {
            unit = *canonical;
            rest = &rest[1..];
        }
    }

    while let Some(first) = rest.first() {
        if LEADING_FILLERS.contains(&first.to_lowercase().as_str()) {
            rest = &rest[1..];
        } else {
            break;
        }
    }

    let ingredient = rest.join(" ").to_lowercase();
    if count.is_none() && unit.is_empty() && ingredient.is_empty() {
        return Ingredient::new(None, "", trimmed);
    }

    Ingredient::new(count, unit, ingredient)
}

/// Render a count for display, preferring mixed fractions ("1 1/2") over decimals.
pub fn format_count(count: f64) -> String {
    if !count.is_finite() {
        return String::new();
    }
    if count < 0.0 {
        let magnitude = format_count(-count);
        return if magnitude == "0" {
            magnitude
        } else {
            format!("-{magnitude}")
        };
    }

    let mut whole = count.trunc();
    let fraction = count - whole;

    if fraction < DISPLAY_TOLERANCE {
        return format!("{whole}");
    }
    if 1.0 - fraction < DISPLAY_TOLERANCE {
        whole += 1.0;
        return format!("{whole}");
    }

    for &denominator in DISPLAY_DENOMINATORS {
        let numerator = (fraction * f64::from(denominator)).round();
        if numerator >= 1.0
            && (numerator / f64::from(denominator) - fraction).abs() < DISPLAY_TOLERANCE
        {
            let (numerator, denominator) = reduce(numerator as u32, denominator);
            return if whole == 0.0 {
                format!("{numerator}/{denominator}")
            } else {
                format!("{whole} {numerator}/{denominator}")
            };
        }
    }

    let rendered = format!("{count:.2}");
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn reduce(numerator: u32, denominator: u32) -> (u32, u32) {
    let mut a = numerator;
    let mut b = denominator;
    while b != 0 {
        (a, b) = (b, a % b);
    }
    (numerator / a, denominator / a)
}

fn strip_parentheticals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Read the count at the start of the token list, returning it together with
/// the number of tokens it spanned.
fn leading_count(tokens: &[&str]) -> (Option<f64>, usize) {
    let Some(first) = tokens.first().and_then(|t| parse_quantity(t)) else {
        return (None, 0);
    };

    if first.whole {
        if let Some(second) = tokens.get(1).and_then(|t| parse_quantity(t)) {
            if !second.whole && second.value < 1.0 {
                return (Some(first.value + second.value), 2);
            }
        }
    }

    (Some(first.value), 1)
}

fn parse_quantity(token: &str) -> Option<Quantity> {
    // Ranges ("1-2") count as their lower bound.
    if let Some((low, high)) = token.split_once(['-', '\u{2013}']) {
        if !low.is_empty() && !high.is_empty() {
            return parse_quantity(low);
        }
        return None;
    }

    if let Some(last) = token.chars().last() {
        if let Some(fraction) = vulgar_fraction(last) {
            let prefix = &token[..token.len() - last.len_utf8()];
            if prefix.is_empty() {
                return Some(Quantity {
                    value: fraction,
                    whole: false,
                });
            }
            let whole = parse_decimal(prefix)?;
            return Some(Quantity {
                value: whole + fraction,
                whole: false,
            });
        }
    }

    if let Some((numerator, denominator)) = token.split_once(['/', '\u{2044}']) {
        let numerator = parse_decimal(numerator)?;
        let denominator = parse_decimal(denominator)?;
        if denominator == 0.0 {
            return None;
        }
        return Some(Quantity {
            value: numerator / denominator,
            whole: false,
        });
    }

    let value = parse_decimal(token)?;
    Some(Quantity {
        value,
        whole: !token.contains('.'),
    })
}

/// Plain decimal numbers only; rejects forms like "inf" or "1e3" that `f64` would accept.
fn parse_decimal(token: &str) -> Option<f64> {
    let valid = !token.is_empty()
        && token.chars().any(|c| c.is_ascii_digit())
        && token.chars().all(|c| c.is_ascii_digit() || c == '.')
        && token.matches('.').count() <= 1;
    if !valid {
        return None;
    }
    token.parse().ok()
}

fn vulgar_fraction(c: char) -> Option<f64> {
    let value = match c {
        '\u{00BD}' => 1.0 / 2.0,
        '\u{2153}' => 1.0 / 3.0,
        '\u{2154}' => 2.0 / 3.0,
        '\u{00BC}' => 1.0 / 4.0,
        '\u{00BE}' => 3.0 / 4.0,
        '\u{2155}' => 1.0 / 5.0,
        '\u{2156}' => 2.0 / 5.0,
        '\u{2157}' => 3.0 / 5.0,
        '\u{2158}' => 4.0 / 5.0,
        '\u{2159}' => 1.0 / 6.0,
        '\u{215A}' => 5.0 / 6.0,
        '\u{215B}' => 1.0 / 8.0,
        '\u{215C}' => 3.0 / 8.0,
        '\u{215D}' => 5.0 / 8.0,
        '\u{215E}' => 7.0 / 8.0,
        _ => return None,
    };
    Some(value)
}
