use skylook_core::{
    FavoriteLocation, SearchResult, TimeOfDay, UnitSystem, WeatherSnapshot, display::toggle_label,
};

pub fn search_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No matching locations.".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{:>2}. {}  [{}]", i + 1, r.label(), r.locator))
        .collect::<Vec<_>>()
        .join("\n")
}

fn saved_mark(saved: bool) -> &'static str {
    if saved { "  ★" } else { "" }
}

pub fn snapshot(snap: &WeatherSnapshot, units: UnitSystem, saved: bool) -> String {
    let loc = &snap.location;
    let cur = &snap.current;
    let time_of_day = TimeOfDay::from_local_time(loc.localtime.as_deref());

    let mut lines = vec![
        format!("{}, {}, {}{}", loc.name, loc.region, loc.country, saved_mark(saved)),
        format!(
            "Local time: {} ({:?})",
            loc.localtime.as_deref().unwrap_or("unknown"),
            time_of_day
        ),
        cur.condition.text.clone(),
        format!("Temperature: {}   Feels like: {}", cur.temperature(units), cur.feels_like(units)),
        format!("Humidity: {}%   Wind: {}", cur.humidity, cur.wind(units)),
        String::new(),
        format!("Forecast for the next {} days:", snap.forecast.days.len()),
    ];

    for day in &snap.forecast.days {
        lines.push(format!(
            "  {}  {:<16} max {:>7}  min {:>7}  sunrise {}  sunset {}",
            day.date,
            day.day.condition.text,
            day.day.max_temperature(units),
            day.day.min_temperature(units),
            day.astro.sunrise,
            day.astro.sunset,
        ));
    }

    lines.push(String::new());
    lines.push(format!("({} with `skylook units toggle`)", toggle_label(units)));
    lines.join("\n")
}

pub fn favorites(list: &[FavoriteLocation]) -> String {
    if list.is_empty() {
        return "No saved locations.".to_string();
    }
    list.iter()
        .map(|f| format!("★ {}, {}, {}", f.name, f.region, f.country))
        .collect::<Vec<_>>()
        .join("\n")
}
