use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    MatchWinner,
    BothTeamsToScore,
    OverUnder25,
}

impl Market {
    pub fn selections(&self) -> &'static [Selection] {
        match self {
            Market::MatchWinner => &[Selection::Home, Selection::Draw, Selection::Away],
            Market::BothTeamsToScore => &[Selection::Yes, Selection::No],
            Market::OverUnder25 => &[Selection::Over, Selection::Under],
        }
    }

    pub const ALL: [Market; 3] = [
        Market::MatchWinner,
        Market::BothTeamsToScore,
        Market::OverUnder25,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Home,
    Draw,
    Away,
    Yes,
    No,
    Over,
    Under,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub market: Market,
    pub selection: Selection,
    pub decimal: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BookmakerOdds {
    pub bookmaker: String,
    pub prices: Vec<Price>,
}

/// Best available decimal price per (market, selection) across bookmakers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketOdds {
    pub prices: Vec<Price>,
}

impl MarketOdds {
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn get(&self, market: Market, selection: Selection) -> Option<f64> {
        self.prices
            .iter()
            .find(|p| p.market == market && p.selection == selection)
            .map(|p| p.decimal)
    }

    /// All selections of `market` in canonical order, or `None` if any is unpriced.
    pub fn full_market(&self, market: Market) -> Option<Vec<f64>> {
        market
            .selections()
            .iter()
            .map(|s| self.get(market, *s))
            .collect()
    }
}

/// Keeps the highest price per selection. Non-finite and non-positive prices are dropped.
pub fn best_odds(books: &[BookmakerOdds]) -> MarketOdds {
    let mut best: Vec<Price> = Vec::new();
    for book in books {
        for price in &book.prices {
            if !price.decimal.is_finite() || price.decimal <= 0.0 {
                continue;
            }
            match best
                .iter_mut()
                .find(|p| p.market == price.market && p.selection == price.selection)
            {
                Some(existing) if existing.decimal >= price.decimal => {}
                Some(existing) => existing.decimal = price.decimal,
                None => best.push(*price),
            }
        }
    }
    MarketOdds { prices: best }
}

/// Reads the provider's `[{bookmakers: [{name, bets: [{name, values: [{value, odd}]}]}]}]`
/// payload (or the bare bookmaker list) into typed bookmaker prices.
pub fn parse_bookmaker_odds(v: &Value) -> Vec<BookmakerOdds> {
    let mut out = Vec::new();
    let items: Vec<&Value> = match v {
        Value::Array(arr) => arr.iter().collect(),
        Value::Object(_) => vec![v],
        _ => return out,
    };

    for item in items {
        if let Some(books) = item.get("bookmakers").and_then(|b| b.as_array()) {
            out.extend(books.iter().filter_map(parse_bookmaker));
        } else if let Some(book) = parse_bookmaker(item) {
            out.push(book);
        }
    }
    out
}

fn parse_bookmaker(v: &Value) -> Option<BookmakerOdds> {
    let bets = v.get("bets")?.as_array()?;
    let bookmaker = v
        .get("name")
        .and_then(|x| x.as_str())
        .unwrap_or_default()
        .to_string();

    let mut prices = Vec::new();
    for bet in bets {
        let Some(market) = bet
            .get("name")
            .and_then(|x| x.as_str())
            .and_then(market_from_label)
        else {
            continue;
        };
        let Some(values) = bet.get("values").and_then(|x| x.as_array()) else {
            continue;
        };
        for value in values {
            let Some(selection) = value
                .get("value")
                .and_then(|x| x.as_str())
                .and_then(|s| selection_from_label(market, s))
            else {
                continue;
            };
            let Some(decimal) = value.get("odd").and_then(parse_decimal) else {
                continue;
            };
            prices.push(Price {
                market,
                selection,
                decimal,
            });
        }
    }
    Some(BookmakerOdds { bookmaker, prices })
}

fn market_from_label(raw: &str) -> Option<Market> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "match winner" | "1x2" | "h2h" => Some(Market::MatchWinner),
        "both teams score" | "both teams to score" | "btts" => Some(Market::BothTeamsToScore),
        "goals over/under" | "over/under" | "totals" => Some(Market::OverUnder25),
        _ => None,
    }
}

fn selection_from_label(market: Market, raw: &str) -> Option<Selection> {
    let s = raw.trim().to_ascii_lowercase();
    match market {
        Market::MatchWinner => match s.as_str() {
            "home" | "1" => Some(Selection::Home),
            "draw" | "x" => Some(Selection::Draw),
            "away" | "2" => Some(Selection::Away),
            _ => None,
        },
        Market::BothTeamsToScore => match s.as_str() {
            "yes" => Some(Selection::Yes),
            "no" => Some(Selection::No),
            _ => None,
        },
        // Only the 2.5 line is priced.
        Market::OverUnder25 => match s.as_str() {
            "over 2.5" => Some(Selection::Over),
            "under 2.5" => Some(Selection::Under),
            _ => None,
        },
    }
}

fn parse_decimal(v: &Value) -> Option<f64> {
    let out = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };
    out.is_finite().then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(market: Market, selection: Selection, decimal: f64) -> Price {
        Price {
            market,
            selection,
            decimal,
        }
    }

    #[test]
    fn best_price_wins_per_selection() {
        let books = vec![
            BookmakerOdds {
                bookmaker: "a".to_string(),
                prices: vec![
                    price(Market::MatchWinner, Selection::Home, 1.85),
                    price(Market::MatchWinner, Selection::Draw, 3.40),
                ],
            },
            BookmakerOdds {
                bookmaker: "b".to_string(),
                prices: vec![
                    price(Market::MatchWinner, Selection::Home, 1.90),
                    price(Market::MatchWinner, Selection::Draw, 3.30),
                    price(Market::MatchWinner, Selection::Away, -4.0),
                ],
            },
        ];
        let best = best_odds(&books);
        assert_eq!(best.get(Market::MatchWinner, Selection::Home), Some(1.90));
        assert_eq!(best.get(Market::MatchWinner, Selection::Draw), Some(3.40));
        assert_eq!(best.get(Market::MatchWinner, Selection::Away), None);
        assert!(best.full_market(Market::MatchWinner).is_none());
    }

    #[test]
    fn parses_provider_payload() {
        let raw = r#"[{"bookmakers": [
            {"name": "Bet365", "bets": [
                {"name": "Match Winner", "values": [
                    {"value": "Home", "odd": "2.10"}, {"value": "Draw", "odd": "3.40"}, {"value": "Away", "odd": "3.60"}]},
                {"name": "Goals Over/Under", "values": [
                    {"value": "Over 2.5", "odd": "1.95"}, {"value": "Under 1.5", "odd": "3.20"}]},
                {"name": "Corners", "values": [{"value": "Over 9.5", "odd": "1.80"}]}
            ]}
        ]}]"#;
        let v: Value = serde_json::from_str(raw).unwrap();
        let books = parse_bookmaker_odds(&v);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].bookmaker, "Bet365");
        assert_eq!(books[0].prices.len(), 4);
        let best = best_odds(&books);
        assert_eq!(
            best.full_market(Market::MatchWinner),
            Some(vec![2.10, 3.40, 3.60])
        );
        assert_eq!(best.get(Market::OverUnder25, Selection::Over), Some(1.95));
    }
}
