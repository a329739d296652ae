use std::collections::BTreeSet;
use tracing::info;

use super::{Carrier, Network};

/// Matplotlib's `tab10` qualitative palette.
pub const TAB10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Colors for `n` items, cycling through the palette.
pub fn generate_colors(n: usize) -> Vec<String> {
    (0..n).map(|i| TAB10[i % TAB10.len()].to_string()).collect()
}

/// Every non-empty carrier referenced by buses or attached components.
pub fn used_carriers(n: &Network) -> BTreeSet<String> {
    n.buses
        .iter()
        .map(|b| b.carrier.as_str())
        .chain(n.attached().into_iter().map(|(_, c)| c.carrier()))
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Adds carriers that components use but the carrier table lacks, then gives
/// every carrier without a color one from the palette (sorted by name).
pub fn ensure_carriers_defined(n: &mut Network) {
    let existing: BTreeSet<String> = n.carriers.iter().map(|c| c.name.clone()).collect();
    let missing: Vec<String> = used_carriers(n).difference(&existing).cloned().collect();

    if !missing.is_empty() {
        info!(count = missing.len(), carriers = ?missing, "adding missing carriers");
        n.carriers.extend(missing.into_iter().map(Carrier::new));
    }

    let mut needing_color: Vec<usize> = n
        .carriers
        .iter()
        .enumerate()
        .filter(|(_, c)| c.color.as_deref().map_or(true, str::is_empty))
        .map(|(i, _)| i)
        .collect();

    if needing_color.is_empty() {
        return;
    }

    needing_color.sort_by(|a, b| n.carriers[*a].name.cmp(&n.carriers[*b].name));
    let colors = generate_colors(needing_color.len());
    for (idx, color) in needing_color.iter().zip(colors) {
        n.carriers[*idx].color = Some(color);
    }
    info!(count = needing_color.len(), palette = "tab10", "assigned carrier colors");
}

/// Title-cases words, leaving words with more than one capital (AC, DC, H2) alone.
pub fn title_except_multi_caps(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            if word.chars().filter(|c| c.is_uppercase()).count() > 1 {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Display name of a carrier: its `nice_name` when set, otherwise the name.
pub fn nice_name(n: &Network, carrier: &str) -> String {
    let raw = n
        .carrier(carrier)
        .and_then(|c| c.nice_name.as_deref())
        .filter(|s| !s.is_empty())
        .unwrap_or(carrier);
    title_except_multi_caps(raw)
}

/// Color for a carrier, grey when the carrier is unknown.
pub fn color_of(n: &Network, carrier: &str) -> String {
    n.carrier(carrier)
        .and_then(|c| c.color.clone())
        .unwrap_or_else(|| "#7f7f7f".to_string())
}

/// Rewrites LaTeX subscripts (`H$_2$`, `CO$_{2}$`) as HTML `<sub>` tags.
pub fn latex_to_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("$_") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('$') else {
            break;
        };
        let sub = after[..end].trim_start_matches('{').trim_end_matches('}');
        out.push_str(&rest[..start]);
        out.push_str("<sub>");
        out.push_str(sub);
        out.push_str("</sub>");
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Bus, Generator};
    use rstest::rstest;

    fn bus(name: &str, carrier: &str) -> Bus {
        Bus {
            name: name.into(),
            carrier: carrier.into(),
            country: "DE".into(),
            x: Some(0.0),
            y: Some(0.0),
            v_nom: None,
        }
    }

    #[rstest]
    #[case("solar thermal", "Solar Thermal")]
    #[case("AC grid", "AC Grid")]
    #[case("H2 Storage", "H2 Storage")]
    #[case("", "")]
    fn test_title_except_multi_caps(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(title_except_multi_caps(input), expected);
    }

    #[rstest]
    #[case("H$_2$", "H<sub>2</sub>")]
    #[case("CO$_{2}$ emissions", "CO<sub>2</sub> emissions")]
    #[case("plain", "plain")]
    #[case("broken $_2", "broken $_2")]
    fn test_latex_to_html(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(latex_to_html(input), expected);
    }

    #[test]
    fn test_ensure_carriers_defined_adds_and_colors() {
        let mut n = Network {
            buses: vec![bus("b0", "AC"), bus("b1", "H2")],
            generators: vec![Generator {
                name: "g0".into(),
                bus: "b0".into(),
                carrier: "wind".into(),
                p_nom: Some(1.0),
                p_nom_opt: None,
                capital_cost: None,
                marginal_cost: None,
            }],
            carriers: vec![Carrier {
                color: Some("#000000".into()),
                ..Carrier::new("AC")
            }],
            ..Default::default()
        };

        ensure_carriers_defined(&mut n);

        let names: Vec<&str> = n.carriers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["AC", "H2", "wind"]);
        assert_eq!(n.carrier("AC").unwrap().color.as_deref(), Some("#000000"));
        assert_eq!(n.carrier("H2").unwrap().color.as_deref(), Some(TAB10[0]));
        assert_eq!(n.carrier("wind").unwrap().color.as_deref(), Some(TAB10[1]));
    }

    #[test]
    fn test_generate_colors_cycles() {
        let colors = generate_colors(12);
        assert_eq!(colors[10], colors[0]);
        assert_eq!(colors.len(), 12);
    }
}
