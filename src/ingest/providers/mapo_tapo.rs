// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mapo Tapo: group trips listed on an HTML calendar page.
//!
//! The calendar is a sequence of month disclosures; each panel lists one row
//! per departure. Every month panel is served as one page, so the usual
//! empty-page termination applies.

use super::{non_empty, MapError};
use crate::ingest::error::FetchError;
use crate::ingest::paginate::{PageRequest, PageSource};
use crate::ingest::retry::{retry, RetryPolicy};
use crate::models::AdventureCreate;
use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROVIDER: &str = "Mapo Tapo";

const SITE_BASE: &str = "https://www.mapotapo.com";

/// One calendar row as scraped from the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapoTapoRow {
    pub trip_name: Option<String>,
    pub href: Option<String>,
    /// Month abbreviation as displayed, e.g. `ott` or `Oct`
    pub month: Option<String>,
    pub day: Option<String>,
    /// Year from the enclosing month panel heading
    pub year: Option<i32>,
    pub location: Option<String>,
    /// Current (not struck-through) price text
    pub price: Option<String>,
    /// e.g. `12 ott - 19 ott | 8 giorni`
    pub date_range: Option<String>,
}

impl MapoTapoRow {
    pub fn into_adventure(self) -> Result<AdventureCreate, MapError> {
        let Some(href) = non_empty(self.href) else {
            return Err(MapError::MissingField {
                provider: PROVIDER,
                id: "mapotapo".to_string(),
                field: "link",
            });
        };
        let slug = url_slug(&href);

        let date = departure_day(self.day.as_deref(), self.month.as_deref(), self.year);
        let Some(date) = date else {
            return Err(MapError::BadDate {
                provider: PROVIDER,
                id: format!("mapotapo-{}", slug),
                value: format!(
                    "{} {} {}",
                    self.day.unwrap_or_default(),
                    self.month.unwrap_or_default(),
                    self.year.map(|y| y.to_string()).unwrap_or_default()
                ),
            });
        };
        let unique_id = format!("mapotapo-{}-{}", slug, date.format("%Y-%m-%d"));

        let Some(trip_name) = non_empty(self.trip_name) else {
            return Err(MapError::MissingField {
                provider: PROVIDER,
                id: unique_id,
                field: "trip name",
            });
        };

        let url = if href.starts_with("http://") || href.starts_with("https://") {
            href
        } else {
            format!("{}{}", SITE_BASE, href)
        };

        Ok(AdventureCreate {
            unique_id,
            provider_name: PROVIDER.to_string(),
            trip_name,
            url: Some(url),
            image_url: None,
            price: self.price.as_deref().and_then(parse_price),
            currency: "EUR".to_string(),
            departure_date: date.and_time(chrono::NaiveTime::MIN).and_utc(),
            duration: self.date_range.as_deref().and_then(parse_duration),
            location: non_empty(self.location).filter(|l| !l.eq_ignore_ascii_case("N/A")),
            activity_type: None,
        })
    }
}

/// [`PageSource`] over the calendar page. The page is fetched once; each
/// month panel with at least one row is one page.
pub struct MapoTapoSource {
    http: reqwest::Client,
    url: String,
    retry: RetryPolicy,
    panels: Option<Vec<Vec<Value>>>,
}

impl MapoTapoSource {
    pub fn new(http: reqwest::Client, url: String, retry: RetryPolicy) -> Self {
        Self {
            http,
            url,
            retry,
            panels: None,
        }
    }

    async fn get_calendar(&self) -> Result<String, FetchError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                provider: PROVIDER,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            provider: PROVIDER,
            source,
        })
    }

    async fn load(&mut self) -> Result<&[Vec<Value>], FetchError> {
        if self.panels.is_none() {
            let html = retry(&self.retry, PROVIDER, || self.get_calendar()).await?;
            let page = parse_calendar(&html)?;
            if !page.collapsed_months.is_empty() {
                tracing::warn!(
                    provider = PROVIDER,
                    months = ?page.collapsed_months,
                    "Collapsed months rendered no rows; calendar may be incomplete"
                );
            }
            let panels = page
                .panels
                .into_iter()
                .map(|rows| {
                    rows.into_iter()
                        .filter_map(|row| serde_json::to_value(row).ok())
                        .collect()
                })
                .collect::<Vec<Vec<Value>>>();
            tracing::info!(
                provider = PROVIDER,
                months = panels.len(),
                "Parsed calendar"
            );
            self.panels = Some(panels);
        }
        Ok(self.panels.as_deref().unwrap_or_default())
    }
}

#[async_trait]
impl PageSource for MapoTapoSource {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_page(&mut self, request: PageRequest) -> Result<Vec<Value>, FetchError> {
        let panels = self.load().await?;
        Ok(panels
            .get(request.page as usize)
            .cloned()
            .unwrap_or_default())
    }
}

struct CalendarSelectors {
    month_button: Selector,
    month_heading: Selector,
    row: Selector,
    trip_name: Selector,
    link: Selector,
    date_block: Selector,
    paragraph: Selector,
    location: Selector,
    price: Selector,
}

impl CalendarSelectors {
    fn new() -> Result<Self, FetchError> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|e| FetchError::Decode {
                provider: PROVIDER,
                message: format!("bad selector {:?}: {}", css, e),
            })
        };

        Ok(Self {
            month_button: parse(r#"button[id^="headlessui-disclosure-button-"]"#)?,
            month_heading: parse("p.font-bold")?,
            row: parse("div > div.group")?,
            trip_name: parse("p.font-bold.text-lg.uppercase")?,
            link: parse("a[href]")?,
            date_block: parse("div.flex.flex-col")?,
            paragraph: parse("p")?,
            location: parse("div.bg-secondary p")?,
            price: parse("b.font-black")?,
        })
    }
}

/// A parsed calendar page.
#[derive(Debug, Default)]
pub struct CalendarPage {
    /// Month panels that contained rows, in page order
    pub panels: Vec<Vec<MapoTapoRow>>,
    /// Headings of collapsed months whose panel rendered no rows
    pub collapsed_months: Vec<String>,
}

/// Split the calendar into month panels of rows. Panels without rows are
/// dropped.
pub fn parse_calendar(html: &str) -> Result<CalendarPage, FetchError> {
    let selectors = CalendarSelectors::new()?;
    let document = Html::parse_document(html);
    let mut page = CalendarPage::default();

    for button in document.select(&selectors.month_button) {
        let heading = button
            .select(&selectors.month_heading)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let year = heading
            .split_whitespace()
            .filter_map(|word| word.parse::<i32>().ok())
            .last();

        let Some(panel) = button.next_siblings().find_map(ElementRef::wrap) else {
            tracing::warn!(provider = PROVIDER, month = %heading, "Month has no panel");
            continue;
        };

        let rows: Vec<MapoTapoRow> = panel
            .select(&selectors.row)
            .map(|row| parse_row(row, year, &selectors))
            .collect();
        tracing::debug!(provider = PROVIDER, month = %heading, rows = rows.len(), "Month panel");

        if !rows.is_empty() {
            page.panels.push(rows);
        } else if button.value().attr("aria-expanded") != Some("true") {
            page.collapsed_months.push(heading);
        }
    }

    Ok(page)
}

fn parse_row(row: ElementRef, year: Option<i32>, selectors: &CalendarSelectors) -> MapoTapoRow {
    let first_text = |selector: &Selector| row.select(selector).next().map(element_text);

    let (month, day) = match row.select(&selectors.date_block).next() {
        Some(block) => {
            let mut parts = block.select(&selectors.paragraph).map(element_text);
            (parts.next(), parts.next())
        }
        None => (None, None),
    };

    let price = row
        .select(&selectors.price)
        .find(|b| {
            !b.value()
                .attr("class")
                .is_some_and(|class| class.contains("line-through"))
        })
        .map(element_text);

    let date_range = row
        .select(&selectors.paragraph)
        .map(element_text)
        .find(|text| text.contains('|'));

    MapoTapoRow {
        trip_name: first_text(&selectors.trip_name),
        href: row
            .select(&selectors.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string),
        month,
        day,
        year,
        location: first_text(&selectors.location),
        price,
        date_range,
    }
}

/// Visible text with whitespace runs collapsed.
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Last path segment of a trip link, without query or fragment.
fn url_slug(href: &str) -> String {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn departure_day(day: Option<&str>, month: Option<&str>, year: Option<i32>) -> Option<NaiveDate> {
    let day: u32 = day?.trim().parse().ok()?;
    let month = month_number(month?)?;
    NaiveDate::from_ymd_opt(year?, month, day)
}

/// Month number from an Italian or English month name or abbreviation.
fn month_number(name: &str) -> Option<u32> {
    let abbr: String = name
        .trim()
        .trim_end_matches('.')
        .chars()
        .take(3)
        .collect::<String>()
        .to_lowercase();

    let month = match abbr.as_str() {
        "gen" | "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "mag" | "may" => 5,
        "giu" | "jun" => 6,
        "lug" | "jul" => 7,
        "ago" | "aug" => 8,
        "set" | "sep" => 9,
        "ott" | "oct" => 10,
        "nov" => 11,
        "dic" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse a displayed price in either European (`1.290,50`) or English
/// (`1,290.50`) notation. Currency symbols and words are ignored.
pub fn parse_price(text: &str) -> Option<f64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let kept = kept.trim_matches(|c| c == '.' || c == ',');
    if !kept.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let normalized = match (kept.rfind('.'), kept.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => kept.replace(',', ""),
        (Some(_), Some(_)) => kept.replace('.', "").replace(',', "."),
        (Some(_), None) => single_separator(kept, '.'),
        (None, Some(_)) => single_separator(kept, ','),
        (None, None) => kept.to_string(),
    };
    normalized.parse().ok()
}

/// With only one kind of separator, it groups thousands when it repeats or
/// is followed by exactly three digits; otherwise it marks decimals.
fn single_separator(text: &str, separator: char) -> String {
    let groups: Vec<&str> = text.split(separator).collect();
    let thousands = groups.len() > 2 || groups.last().is_some_and(|g| g.len() == 3);
    if thousands {
        groups.concat()
    } else {
        text.replace(separator, ".")
    }
}

/// Trip length from an `N giorni` or `N days` token.
pub fn parse_duration(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| c.is_whitespace() || matches!(c, '|' | '(' | ')' | ',' | '-'))
        .filter(|w| !w.is_empty())
        .collect();

    words.windows(2).find_map(|pair| {
        let unit = pair[1];
        if unit.starts_with("giorn") || unit.starts_with("day") {
            pair[0].parse().ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::format_utc_rfc3339;

    const CALENDAR: &str = r#"
<html><body><main>
  <button id="headlessui-disclosure-button-1" aria-expanded="true">
    <p class="font-bold">Ottobre 2026</p>
  </button>
  <div>
    <div>
      <div class="group">
        <a href="/viaggi/trekking-dolomiti?ref=calendar">
          <div class="flex flex-col"><p>ott</p><p>12</p></div>
          <p class="font-bold text-lg uppercase">Trekking Dolomiti</p>
          <div class="bg-secondary"><p>Italia</p></div>
          <p>12 ott - 19 ott | 8 giorni</p>
          <b class="font-black line-through">€ 1.490</b>
          <b class="font-black">€ 1.290</b>
        </a>
      </div>
      <div class="group">
        <a href="/viaggi/islanda-on-the-road/">
          <div class="flex flex-col"><p>Oct</p><p>30</p></div>
          <p class="font-bold text-lg uppercase">Islanda On The Road</p>
          <p>30 Oct - 6 Nov | 8 days</p>
          <b class="font-black">N/A</b>
        </a>
      </div>
    </div>
  </div>
  <button id="headlessui-disclosure-button-2" aria-expanded="false">
    <p class="font-bold">Novembre 2026</p>
  </button>
  <div></div>
  <button id="headlessui-disclosure-button-3" aria-expanded="false">
    <p class="font-bold">Gennaio 2027</p>
  </button>
  <div>
    <div>
      <div class="group">
        <a href="https://www.mapotapo.com/viaggi/lapponia">
          <div class="flex flex-col"><p>gen</p><p>3</p></div>
          <p class="font-bold text-lg uppercase">Lapponia</p>
          <div class="bg-secondary"><p>N/A</p></div>
          <b class="font-black">€ 2.150,50</b>
        </a>
      </div>
    </div>
  </div>
</main></body></html>
"#;

    #[test]
    fn test_parse_calendar_panels_and_rows() {
        let panels = parse_calendar(CALENDAR).unwrap().panels;

        // the empty November panel is dropped
        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].len(), 2);
        assert_eq!(panels[1].len(), 1);

        let first = &panels[0][0];
        assert_eq!(first.trip_name.as_deref(), Some("Trekking Dolomiti"));
        assert_eq!(first.href.as_deref(), Some("/viaggi/trekking-dolomiti?ref=calendar"));
        assert_eq!(first.month.as_deref(), Some("ott"));
        assert_eq!(first.day.as_deref(), Some("12"));
        assert_eq!(first.year, Some(2026));
        assert_eq!(first.location.as_deref(), Some("Italia"));
        assert_eq!(first.price.as_deref(), Some("€ 1.290"));
        assert_eq!(first.date_range.as_deref(), Some("12 ott - 19 ott | 8 giorni"));

        assert_eq!(panels[0][1].location, None);
        assert_eq!(panels[1][0].year, Some(2027));
    }

    #[test]
    fn test_rows_map_to_adventures() {
        let panels = parse_calendar(CALENDAR).unwrap().panels;

        let dolomiti = panels[0][0].clone().into_adventure().unwrap();
        assert_eq!(dolomiti.unique_id, "mapotapo-trekking-dolomiti-2026-10-12");
        assert_eq!(dolomiti.provider_name, "Mapo Tapo");
        assert_eq!(
            dolomiti.url.as_deref(),
            Some("https://www.mapotapo.com/viaggi/trekking-dolomiti?ref=calendar")
        );
        assert_eq!(dolomiti.price, Some(1290.0));
        assert_eq!(dolomiti.currency, "EUR");
        assert_eq!(dolomiti.duration, Some(8));
        assert_eq!(dolomiti.location.as_deref(), Some("Italia"));
        assert_eq!(
            format_utc_rfc3339(dolomiti.departure_date),
            "2026-10-12T00:00:00Z"
        );

        let islanda = panels[0][1].clone().into_adventure().unwrap();
        assert_eq!(islanda.unique_id, "mapotapo-islanda-on-the-road-2026-10-30");
        assert_eq!(islanda.price, None);
        assert_eq!(islanda.duration, Some(8));

        let lapponia = panels[1][0].clone().into_adventure().unwrap();
        assert_eq!(lapponia.unique_id, "mapotapo-lapponia-2027-01-03");
        assert_eq!(lapponia.url.as_deref(), Some("https://www.mapotapo.com/viaggi/lapponia"));
        assert_eq!(lapponia.price, Some(2150.5));
        assert_eq!(lapponia.location, None);
    }

    #[test]
    fn test_unparseable_day_is_a_bad_date() {
        let row = MapoTapoRow {
            trip_name: Some("Trip".to_string()),
            href: Some("/viaggi/trip".to_string()),
            month: Some("xyz".to_string()),
            day: Some("12".to_string()),
            year: Some(2026),
            ..MapoTapoRow::default()
        };
        assert!(matches!(
            row.into_adventure(),
            Err(MapError::BadDate { id, .. }) if id == "mapotapo-trip"
        ));
    }

    #[test]
    fn test_parse_price_formats() {
        assert_eq!(parse_price("€ 1.290"), Some(1290.0));
        assert_eq!(parse_price("1.290,50 €"), Some(1290.5));
        assert_eq!(parse_price("£1,290.50"), Some(1290.5));
        assert_eq!(parse_price("1,290"), Some(1290.0));
        assert_eq!(parse_price("€890"), Some(890.0));
        assert_eq!(parse_price("12,5"), Some(12.5));
        assert_eq!(parse_price("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_price("N/A"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("12 ott - 19 ott | 8 giorni"), Some(8));
        assert_eq!(parse_duration("1 giorno"), Some(1));
        assert_eq!(parse_duration("30 Oct - 6 Nov | 8 Days"), Some(8));
        assert_eq!(parse_duration("12 ott - 19 ott"), None);
    }

    #[test]
    fn test_collapsed_months_without_rows_are_reported() {
        let page = parse_calendar(CALENDAR).unwrap();

        // January is collapsed too, but its rows were rendered
        assert_eq!(page.collapsed_months, vec!["Novembre 2026".to_string()]);
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_number("ott"), Some(10));
        assert_eq!(month_number("Ottobre"), Some(10));
        assert_eq!(month_number("MAG"), Some(5));
        assert_eq!(month_number("Dec."), Some(12));
        assert_eq!(month_number("??"), None);
    }

    #[tokio::test]
    async fn test_source_serves_one_panel_per_page() {
        let panels = parse_calendar(CALENDAR)
            .unwrap()
            .panels
            .into_iter()
            .map(|rows| {
                rows.into_iter()
                    .map(|row| serde_json::to_value(row).unwrap())
                    .collect()
            })
            .collect();
        let mut source = MapoTapoSource {
            panels: Some(panels),
            ..MapoTapoSource::new(reqwest::Client::new(), String::new(), RetryPolicy::none())
        };

        let page = |page| PageRequest { page, after: None };
        assert_eq!(source.fetch_page(page(0)).await.unwrap().len(), 2);
        assert_eq!(source.fetch_page(page(1)).await.unwrap().len(), 1);
        assert!(source.fetch_page(page(2)).await.unwrap().is_empty());
    }
}
