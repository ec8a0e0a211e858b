use super::int_arg;
use anyhow::anyhow;
use async_trait::async_trait;
use domain::models::ToolParameters;
use domain::services::{Capability, CapabilitySource};
use serde::Serialize;
use serde_json::{json, Value};
use shared::types::JsonMap;

/// Upper bound used for the sitting president's open-ended term.
const CURRENT_YEAR: i64 = 2025;

#[derive(Debug, Clone, Copy, Serialize)]
struct President {
    name: &'static str,
    years: &'static str,
    number: u32,
    party: &'static str,
}

const fn p(number: u32, name: &'static str, years: &'static str, party: &'static str) -> President {
    President {
        name,
        years,
        number,
        party,
    }
}

static PRESIDENTS: [President; 46] = [
    p(1, "George Washington", "1789-1797", "Independent"),
    p(2, "John Adams", "1797-1801", "Federalist"),
    p(3, "Thomas Jefferson", "1801-1809", "Democratic-Republican"),
    p(4, "James Madison", "1809-1817", "Democratic-Republican"),
    p(5, "James Monroe", "1817-1825", "Democratic-Republican"),
    p(6, "John Quincy Adams", "1825-1829", "Democratic-Republican"),
    p(7, "Andrew Jackson", "1829-1837", "Democratic"),
    p(8, "Martin Van Buren", "1837-1841", "Democratic"),
    p(9, "William Henry Harrison", "1841", "Whig"),
    p(10, "John Tyler", "1841-1845", "Whig"),
    p(11, "James K. Polk", "1845-1849", "Democratic"),
    p(12, "Zachary Taylor", "1849-1850", "Whig"),
    p(13, "Millard Fillmore", "1850-1853", "Whig"),
    p(14, "Franklin Pierce", "1853-1857", "Democratic"),
    p(15, "James Buchanan", "1857-1861", "Democratic"),
    p(16, "Abraham Lincoln", "1861-1865", "Republican"),
    p(17, "Andrew Johnson", "1865-1869", "Democratic"),
    p(18, "Ulysses S. Grant", "1869-1877", "Republican"),
    p(19, "Rutherford B. Hayes", "1877-1881", "Republican"),
    p(20, "James A. Garfield", "1881", "Republican"),
    p(21, "Chester A. Arthur", "1881-1885", "Republican"),
    p(22, "Grover Cleveland", "1885-1889", "Democratic"),
    p(23, "Benjamin Harrison", "1889-1893", "Republican"),
    p(24, "Grover Cleveland", "1893-1897", "Democratic"),
    p(25, "William McKinley", "1897-1901", "Republican"),
    p(26, "Theodore Roosevelt", "1901-1909", "Republican"),
    p(27, "William Howard Taft", "1909-1913", "Republican"),
    p(28, "Woodrow Wilson", "1913-1921", "Democratic"),
    p(29, "Warren G. Harding", "1921-1923", "Republican"),
    p(30, "Calvin Coolidge", "1923-1929", "Republican"),
    p(31, "Herbert Hoover", "1929-1933", "Republican"),
    p(32, "Franklin D. Roosevelt", "1933-1945", "Democratic"),
    p(33, "Harry S. Truman", "1945-1953", "Democratic"),
    p(34, "Dwight D. Eisenhower", "1953-1961", "Republican"),
    p(35, "John F. Kennedy", "1961-1963", "Democratic"),
    p(36, "Lyndon B. Johnson", "1963-1969", "Democratic"),
    p(37, "Richard Nixon", "1969-1974", "Republican"),
    p(38, "Gerald Ford", "1974-1977", "Republican"),
    p(39, "Jimmy Carter", "1977-1981", "Democratic"),
    p(40, "Ronald Reagan", "1981-1989", "Republican"),
    p(41, "George H.W. Bush", "1989-1993", "Republican"),
    p(42, "Bill Clinton", "1993-2001", "Democratic"),
    p(43, "George W. Bush", "2001-2009", "Republican"),
    p(44, "Barack Obama", "2009-2017", "Democratic"),
    p(45, "Donald Trump", "2017-2021", "Republican"),
    p(46, "Joe Biden", "2021-present", "Democratic"),
];

impl President {
    fn term(&self) -> (i64, i64) {
        match self.years.split_once('-') {
            Some((start, end)) => {
                let start = start.parse().unwrap_or(0);
                let end = if end == "present" {
                    CURRENT_YEAR
                } else {
                    end.parse().unwrap_or(start)
                };
                (start, end)
            }
            None => {
                let year = self.years.parse().unwrap_or(0);
                (year, year)
            }
        }
    }
}

/// First president whose term covers `year`.
fn in_office(year: i64) -> Option<&'static President> {
    PRESIDENTS.iter().find(|pres| {
        let (start, end) = pres.term();
        start <= year && year <= end
    })
}

pub struct PresidentSource;

impl CapabilitySource for PresidentSource {
    fn source_name(&self) -> &str {
        "presidents"
    }

    fn capabilities(&self) -> Vec<Box<dyn Capability>> {
        vec![
            Box::new(GetUsPresidents),
            Box::new(GetPresidentByYear),
            Box::new(GetLongestServingPresident),
        ]
    }
}

pub struct GetUsPresidents;

#[async_trait]
impl Capability for GetUsPresidents {
    fn name(&self) -> &str {
        "get_us_presidents"
    }

    fn description(&self) -> &str {
        "Get information about all US Presidents with their terms in office"
    }

    async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
        Ok(json!({
            "total_presidents": PRESIDENTS.len(),
            "presidents": &PRESIDENTS[..],
        }))
    }
}

pub struct GetPresidentByYear;

#[async_trait]
impl Capability for GetPresidentByYear {
    fn name(&self) -> &str {
        "get_president_by_year"
    }

    fn description(&self) -> &str {
        "Get the US President who was in office during a specific year"
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::empty().required("year", "integer", "The year to check, e.g. 1863")
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let year = int_arg(&args, "year")
            .ok_or_else(|| anyhow!("Please provide a valid year as a number"))?;
        match in_office(year) {
            Some(president) => Ok(serde_json::to_value(president)?),
            None => Err(anyhow!(
                "No president found for year {}. US presidents started serving in 1789.",
                year
            )),
        }
    }
}

pub struct GetLongestServingPresident;

#[async_trait]
impl Capability for GetLongestServingPresident {
    fn name(&self) -> &str {
        "get_longest_serving_president"
    }

    fn description(&self) -> &str {
        "Get information about the US President who served the longest"
    }

    async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
        Ok(json!({
            "name": "Franklin D. Roosevelt",
            "years": "1933-1945",
            "number": 32,
            "party": "Democratic",
            "terms": 4,
            "years_served": 12,
            "note": "Only president to serve more than two terms, died in office during his 4th term",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_office() {
        assert_eq!(in_office(1863).map(|p| p.name), Some("Abraham Lincoln"));
        assert_eq!(in_office(1841).map(|p| p.number), Some(8));
        assert_eq!(in_office(2024).map(|p| p.name), Some("Joe Biden"));
        assert!(in_office(1700).is_none());
    }

    #[tokio::test]
    async fn test_year_argument_accepts_strings() {
        let args = domain::models::normalize_arguments(json!({"year": "1950"}));
        let value = GetPresidentByYear.invoke(args).await.unwrap();
        assert_eq!(value["name"], "Harry S. Truman");
    }

    #[tokio::test]
    async fn test_unknown_year_is_an_error() {
        let args = domain::models::normalize_arguments(json!({"year": 1500}));
        let err = GetPresidentByYear.invoke(args).await.unwrap_err();
        assert!(err.to_string().contains("started serving in 1789"));
    }

    #[tokio::test]
    async fn test_listing_counts_every_term() {
        let value = GetUsPresidents.invoke(JsonMap::new()).await.unwrap();
        assert_eq!(value["total_presidents"], 46);
        assert_eq!(value["presidents"][0]["name"], "George Washington");
    }
}
