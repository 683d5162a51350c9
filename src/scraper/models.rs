use crate::domain::Record;
use crate::scraper::ScraperError;
use scraper::{ElementRef, Html, Selector};

// article[data-name="CardComponent"]
//  ├── a[href*="/rent/flat/<id>/"]          -> offer_id, offer_url
//  ├── [data-mark="OfferTitle"]             -> "2-комн. квартира, 54 м², 3/9 этаж"
//  ├── [data-mark="OfferSubtitle"]          -> same shape when the title is an ad line
//  ├── [data-mark="MainPrice"]              -> "120 000 ₽/мес."
//  ├── [data-name="SpecialGeo"] a           -> metro station
//  ├── [data-name="SpecialGeo"] div         -> "5 минут пешком"
//  ├── a[data-name="GeoLabel"] (repeated)   -> city, district, ..., street, house
//  └── [data-name="TimeLabel"]              -> "сегодня, 12:40"

const CARD: &str = r#"article[data-name="CardComponent"]"#;
const LINK: &str = r#"a[href*="/flat/"]"#;
const TITLE: &str = r#"[data-mark="OfferTitle"]"#;
const SUBTITLE: &str = r#"[data-mark="OfferSubtitle"]"#;
const PRICE: &str = r#"[data-mark="MainPrice"]"#;
const METRO: &str = r#"[data-name="SpecialGeo"] a"#;
const WALK: &str = r#"[data-name="SpecialGeo"] div"#;
const GEO: &str = r#"a[data-name="GeoLabel"]"#;
const TIME: &str = r#"[data-name="TimeLabel"]"#;

/// One search-result card, flattened to text.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferCard {
    pub offer_id: String,
    pub offer_url: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub price_label: Option<String>,
    pub metro: Option<String>,
    pub walking_time: Option<String>,
    pub geo: Vec<String>,
    pub time_label: Option<String>,
}

struct CardSelectors {
    card: Selector,
    link: Selector,
    title: Selector,
    subtitle: Selector,
    price: Selector,
    metro: Selector,
    walk: Selector,
    geo: Selector,
    time: Selector,
}

impl CardSelectors {
    fn new() -> Result<Self, ScraperError> {
        let parse =
            |s: &str| Selector::parse(s).map_err(|e| ScraperError::HtmlParse(e.to_string()));
        Ok(Self {
            card: parse(CARD)?,
            link: parse(LINK)?,
            title: parse(TITLE)?,
            subtitle: parse(SUBTITLE)?,
            price: parse(PRICE)?,
            metro: parse(METRO)?,
            walk: parse(WALK)?,
            geo: parse(GEO)?,
            time: parse(TIME)?,
        })
    }
}

fn clean_text(el: ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector).next().and_then(clean_text)
}

/// Pulls every offer card out of a search results page.
/// Cards without a recognisable offer link are skipped.
pub fn parse_offer_cards(html: &str) -> Result<Vec<OfferCard>, ScraperError> {
    let sel = CardSelectors::new()?;
    let document = Html::parse_document(html);

    let mut cards = Vec::new();
    for card in document.select(&sel.card) {
        let Some((offer_id, offer_url)) = card
            .select(&sel.link)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| offer_id_from_url(href).map(|id| (id, href.to_string())))
        else {
            log::warn!("Skipping card: missing offer link");
            continue;
        };

        cards.push(OfferCard {
            offer_id,
            offer_url,
            title: first_text(card, &sel.title),
            subtitle: first_text(card, &sel.subtitle),
            price_label: first_text(card, &sel.price),
            metro: first_text(card, &sel.metro),
            walking_time: first_text(card, &sel.walk),
            geo: card.select(&sel.geo).filter_map(clean_text).collect(),
            time_label: first_text(card, &sel.time),
        });
    }

    Ok(cards)
}

/// "https://www.cian.ru/rent/flat/317236842/" -> "317236842"
pub fn offer_id_from_url(url: &str) -> Option<String> {
    let start = url.find("/flat/")? + "/flat/".len();
    let id: String = url[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    (!id.is_empty()).then_some(id)
}

/// "120 000 ₽/мес." -> 120000. Only the part before the currency sign counts.
pub fn parse_price(label: &str) -> Option<i64> {
    let amount = label.split('₽').next().unwrap_or(label);
    let digits: String = amount.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// "2-комн. квартира" -> 2, "Студия" -> 0.
pub fn parse_rooms(text: &str) -> Option<i32> {
    if text.to_lowercase().contains("студия") {
        return Some(0);
    }
    let idx = text.find("-комн")?;
    let digits: String = text[..idx]
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

/// "..., 3/9 этаж" -> 3.
pub fn parse_floor(text: &str) -> Option<i32> {
    let idx = text.find("этаж")?;
    let token = text[..idx].split_whitespace().last()?;
    token.split('/').next()?.trim().parse().ok()
}

impl OfferCard {
    /// Title and subtitle, whichever carries the "N-комн., x/y этаж" line.
    fn summary_lines(&self) -> impl Iterator<Item = &str> {
        self.title.as_deref().into_iter().chain(self.subtitle.as_deref())
    }

    /// Street + house number, the last two geo labels.
    fn building_id(&self) -> Option<String> {
        match self.geo.as_slice() {
            [.., street, house] => Some(format!("{street}, {house}")),
            _ => None,
        }
    }

    pub fn into_record(self) -> Record {
        let rooms = self.summary_lines().find_map(parse_rooms);
        let floor = self.summary_lines().find_map(parse_floor);
        let building_id = self.building_id();
        let price = self.price_label.as_deref().and_then(parse_price);

        let mut record = Record {
            building_id,
            floor,
            rooms,
            ..Record::new(self.offer_id, price)
        };

        let attrs = [
            ("title", self.title),
            ("subtitle", self.subtitle),
            ("price", self.price_label),
            ("metro", self.metro),
            ("walking_time", self.walking_time),
            ("time_label", self.time_label),
        ];
        for (key, value) in attrs {
            if let Some(value) = value {
                record.attributes.insert(key.to_string(), value.into());
            }
        }
        if !self.geo.is_empty() {
            record
                .attributes
                .insert("address".to_string(), self.geo.join(", ").into());
        }
        record
            .attributes
            .insert("offer_url".to_string(), self.offer_url.into());

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <html><body>
        <article data-name="CardComponent">
          <a href="https://www.cian.ru/rent/flat/317236842/">
            <span data-mark="OfferTitle"><span>2-комн. квартира, 54 м², 3/9 этаж</span></span>
          </a>
          <span data-mark="MainPrice"><span>120&nbsp;000&nbsp;₽/мес.</span></span>
          <div data-name="SpecialGeo"><a href="/metro/1">Пушкинская</a><div>5 минут пешком</div></div>
          <a data-name="GeoLabel" href="#">Москва</a>
          <a data-name="GeoLabel" href="#">ЦАО</a>
          <a data-name="GeoLabel" href="#">Тверская улица</a>
          <a data-name="GeoLabel" href="#">12</a>
          <div data-name="TimeLabel">сегодня, 12:40</div>
        </article>
        <article data-name="CardComponent">
          <a href="https://www.cian.ru/rent/flat/300000001/">
            <span data-mark="OfferTitle">Уютная студия у метро</span>
          </a>
          <span data-mark="OfferSubtitle">Студия, 25 м², 7/12 этаж</span>
          <span data-mark="MainPrice">65 000 ₽/мес.</span>
        </article>
        <article data-name="CardComponent">
          <span data-mark="OfferTitle">Рекламный блок</span>
        </article>
        </body></html>
    "##;

    #[test]
    fn parses_cards_and_skips_ones_without_link() {
        let cards = parse_offer_cards(PAGE).unwrap();
        assert_eq!(cards.len(), 2);

        let first = &cards[0];
        assert_eq!(first.offer_id, "317236842");
        assert_eq!(first.title.as_deref(), Some("2-комн. квартира, 54 м², 3/9 этаж"));
        assert_eq!(first.metro.as_deref(), Some("Пушкинская"));
        assert_eq!(first.walking_time.as_deref(), Some("5 минут пешком"));
        assert_eq!(cards[1].walking_time, None);
        assert_eq!(first.geo.len(), 4);
        assert_eq!(first.time_label.as_deref(), Some("сегодня, 12:40"));
    }

    #[test]
    fn card_becomes_record_with_identity_fields() {
        let cards = parse_offer_cards(PAGE).unwrap();
        let records: Vec<Record> = cards.into_iter().map(OfferCard::into_record).collect();

        let flat = &records[0];
        assert_eq!(flat.price, Some(120_000));
        assert_eq!(flat.rooms, Some(2));
        assert_eq!(flat.floor, Some(3));
        assert_eq!(flat.building_id.as_deref(), Some("Тверская улица, 12"));
        assert!(flat.identity_key().is_some());
        assert_eq!(flat.attr("walking_time"), Some("5 минут пешком"));
        assert_eq!(
            flat.attr("offer_url"),
            Some("https://www.cian.ru/rent/flat/317236842/")
        );

        // rooms/floor come from the subtitle, no geo -> not matchable
        let studio = &records[1];
        assert_eq!(studio.rooms, Some(0));
        assert_eq!(studio.floor, Some(7));
        assert_eq!(studio.price, Some(65_000));
        assert_eq!(studio.building_id, None);
        assert!(studio.identity_key().is_none());
    }

    #[test]
    fn field_parsers() {
        assert_eq!(offer_id_from_url("/rent/flat/42/"), Some("42".to_string()));
        assert_eq!(offer_id_from_url("/rent/flat/"), None);
        assert_eq!(parse_price("1 250 000 ₽/мес., залог 50 000 ₽"), Some(1_250_000));
        assert_eq!(parse_price("Цена не указана"), None);
        assert_eq!(parse_rooms("3-комн. апартаменты"), Some(3));
        assert_eq!(parse_rooms("Комната"), None);
        assert_eq!(parse_floor("1-комн. кв., 38 м², 14/25 этаж"), Some(14));
        assert_eq!(parse_floor("без этажа"), None);
    }

    #[test]
    fn empty_page_has_no_cards() {
        assert!(parse_offer_cards("<html></html>").unwrap().is_empty());
    }
}
