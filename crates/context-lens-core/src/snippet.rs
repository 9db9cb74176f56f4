//! Simulated search-engine snippets.
//!
//! Search grounding metadata carries only a title and URI per source, so
//! the search scenario attaches a canned sentence to each source for
//! display. A handful of demo topics get topical text; everything else
//! gets a generic sentence naming the source.

/// Return a plausible snippet for a source `title` found for `query`.
///
/// The result is never empty.
pub fn simulate_snippet(query: &str, title: &str) -> String {
    let query = query.to_lowercase();
    let title_lower = title.to_lowercase();

    if query.contains("super bowl") {
        return "The Kansas City Chiefs secured a dramatic overtime victory against the San Francisco 49ers in Super Bowl LVIII. The final score was 25-22... (Simulated snippet)".to_string();
    }
    if query.contains("trending movies") {
        return "This month's box office is led by the sci-fi epic 'Dune: Part Two'. In streaming, the romantic comedy 'Anyone But You' is a surprise hit... (Simulated snippet)".to_string();
    }
    if query.contains("weather") && query.contains("tokyo") {
        return "Tokyo is expecting partly cloudy skies with a high of 15°C (59°F). Winds are light from the north. There is a low chance of precipitation... (Simulated snippet)".to_string();
    }
    if query.contains("space exploration") {
        if title_lower.contains("artemis") {
            return "NASA's Artemis program continues to make progress towards returning humans to the Moon, with recent successful tests of the SLS rocket's engines... (Simulated snippet)".to_string();
        }
        return "Recent developments include new images from the James Webb Space Telescope revealing details of distant galaxies and SpaceX's ongoing Starship tests... (Simulated snippet)".to_string();
    }

    format!(
        "This is a simulated text snippet from \"{}\" containing information relevant to your query. The model uses such text to formulate its final answer.",
        title
    )
}
