//! DLsite scraping client.
//!
//! Product pages are fetched without automatic redirect handling so that an
//! identifier that was renumbered upstream surfaces as
//! [`CatalogResponse::Redirect`] instead of silently becoming another work.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use log::{debug, warn};
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::LOCATION;
use reqwest::{redirect, StatusCode};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use url::Url;

use super::{CatalogClient, CatalogResponse, MetadataRecord, ResolveError};
use crate::work::number::WorkNumber;

const SITE_ROOT: &str = "https://www.dlsite.com";
const CHOBIT_EMBED: &str = "https://chobit.cc/api/v1/dlsite/embed";
const USER_AGENT: &str = concat!("dvtag/", env!("CARGO_PKG_VERSION"));
const PAGE_LOCALE: &str = "zh_CN";
/// Same-identifier hops (site section moves) tolerated per fetch.
const MAX_SECTION_HOPS: usize = 3;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(PRODUCT_NAME_SELECTOR, "[data-product-name]");
selector!(MAKER_NAME_SELECTOR, "[data-maker-name]");
selector!(OG_IMAGE_SELECTOR, r#"meta[property="og:image"]"#);
selector!(ROW_SELECTOR, "tr");
selector!(TH_SELECTOR, "th");
selector!(TD_ANCHOR_SELECTOR, "td a");
selector!(GENRE_SELECTOR, r#"div.main_genre a, a[data-vars-link="work.genre"]"#);
selector!(SALE_DATE_LINK_SELECTOR, r#"a[href*="/new/=/year/"]"#);

static SALE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/new/=/year/([0-9]{4})/mon/([0-9]{2})/day/([0-9]{2})/").unwrap());

/// Fields scraped from a product page, before chobit refinement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPage {
    pub name: String,
    pub circle: String,
    pub image_url: String,
    pub voice_actors: Vec<String>,
    pub genres: Vec<String>,
    pub sale_date: String,
}

#[derive(Debug, Deserialize)]
struct ChobitEmbed {
    count: u32,
    #[serde(default)]
    works: Vec<ChobitWork>,
}

#[derive(Debug, Deserialize)]
struct ChobitWork {
    #[serde(default)]
    file_type: String,
    #[serde(default)]
    thumb: String,
    #[serde(default)]
    work_name: String,
}

pub struct DlsiteClient {
    pages: Client,
    assets: Client,
    fetch_cover: bool,
}

impl DlsiteClient {
    pub fn new(fetch_cover: bool) -> reqwest::Result<Self> {
        let pages = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .redirect(redirect::Policy::none())
            .build()?;
        let assets = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            pages,
            assets,
            fetch_cover,
        })
    }

    fn product_url(work: &WorkNumber) -> String {
        format!("{SITE_ROOT}/maniax/work/=/product_id/{work}.html")
    }

    fn fetch_product_page(&self, work: &WorkNumber) -> Result<CatalogResponse, ResolveError> {
        let mut url = Self::product_url(work);

        for _ in 0..=MAX_SECTION_HOPS {
            let rsp = self
                .pages
                .get(&url)
                .query(&[("locale", PAGE_LOCALE)])
                .send()
                .map_err(|e| ResolveError::network(work, e))?;

            let status = rsp.status();
            if status.is_redirection() {
                let location = redirect_location(work, &rsp)?;
                match WorkNumber::extract(location.path()) {
                    Some(target) if &target == work => {
                        debug!("[{}] product page moved to {}", work, location);
                        url = strip_query(location);
                        continue;
                    }
                    Some(target) => return Ok(CatalogResponse::Redirect(target)),
                    None => {
                        return Err(ResolveError::parse(
                            work,
                            format!("redirect to non-work page {location}"),
                        ))
                    }
                }
            }

            let html = success_body(work, rsp)?;
            let page = parse_product_page(work, &html)?;
            return Ok(CatalogResponse::Found(self.build_record(work, page)?));
        }

        Err(ResolveError::parse(work, "too many product page redirects"))
    }

    fn build_record(
        &self,
        work: &WorkNumber,
        mut page: ProductPage,
    ) -> Result<MetadataRecord, ResolveError> {
        self.refine_with_chobit(work, &mut page)?;

        let cover = if self.fetch_cover {
            match self.fetch_image(&page.image_url) {
                Ok(bytes) => Some(Arc::new(bytes)),
                Err(e) => {
                    warn!("[{}] cannot fetch cover {}: {}", work, page.image_url, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(MetadataRecord {
            work_number: work.clone(),
            work_title: page.name,
            circle_name: page.circle,
            genres: page.genres,
            voice_actors: page.voice_actors,
            sale_date: Some(page.sale_date),
            cover,
        })
    }

    fn refine_with_chobit(
        &self,
        work: &WorkNumber,
        page: &mut ProductPage,
    ) -> Result<(), ResolveError> {
        let rsp = self
            .assets
            .get(CHOBIT_EMBED)
            .query(&[("workno", work.to_string())])
            .send()
            .map_err(|e| ResolveError::network(work, e))?;
        let body = success_body(work, rsp)?;
        apply_chobit(work, page, &body)
    }

    fn fetch_image(&self, url: &str) -> reqwest::Result<Vec<u8>> {
        let rsp = self.assets.get(url).send()?.error_for_status()?;
        Ok(rsp.bytes()?.to_vec())
    }
}

impl CatalogClient for DlsiteClient {
    fn fetch(&self, work: &WorkNumber) -> Result<CatalogResponse, ResolveError> {
        self.fetch_product_page(work)
    }
}

fn redirect_location(work: &WorkNumber, rsp: &Response) -> Result<Url, ResolveError> {
    let location = rsp
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ResolveError::parse(work, "redirect without location"))?;
    rsp.url()
        .join(location)
        .map_err(|e| ResolveError::parse(work, format!("bad redirect location {location}: {e}")))
}

fn strip_query(mut url: Url) -> String {
    url.set_query(None);
    url.to_string()
}

fn success_body(work: &WorkNumber, rsp: Response) -> Result<String, ResolveError> {
    match rsp.status() {
        StatusCode::NOT_FOUND | StatusCode::GONE => Err(ResolveError::NotFound(work.clone())),
        status if !status.is_success() => {
            Err(ResolveError::network(work, format!("{} from {}", status, rsp.url())))
        }
        _ => rsp.text().map_err(|e| ResolveError::network(work, e)),
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_attr(document: &Html, selector: &Selector, attr: &str) -> Option<String> {
    document
        .select(selector)
        .find_map(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Extracts work metadata from a product page.
pub fn parse_product_page(work: &WorkNumber, html: &str) -> Result<ProductPage, ResolveError> {
    let document = Html::parse_document(html);

    let name = first_attr(&document, &PRODUCT_NAME_SELECTOR, "data-product-name")
        .ok_or_else(|| ResolveError::parse(work, "no work name found"))?;
    let circle = first_attr(&document, &MAKER_NAME_SELECTOR, "data-maker-name")
        .ok_or_else(|| ResolveError::parse(work, "no circle name found"))?;

    let image_url = first_attr(&document, &OG_IMAGE_SELECTOR, "content")
        .ok_or_else(|| ResolveError::parse(work, "no cover image url found"))?;
    let image_url =
        absolute_url(&image_url).ok_or_else(|| ResolveError::parse(work, "bad cover image url"))?;

    let voice_actors = document
        .select(&ROW_SELECTOR)
        .find(|row| row.select(&TH_SELECTOR).any(|th| text_of(th) == "声优"))
        .map(|row| {
            row.select(&TD_ANCHOR_SELECTOR)
                .map(text_of)
                .filter(|actor| !actor.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut genres: Vec<String> = Vec::new();
    for genre in document.select(&GENRE_SELECTOR).map(text_of) {
        if !genre.is_empty() && !genres.contains(&genre) {
            genres.push(genre);
        }
    }

    let sale_date = document
        .select(&SALE_DATE_LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| SALE_DATE_RE.captures(href))
        .map(|date| format!("{}-{}-{}", &date[1], &date[2], &date[3]))
        .ok_or_else(|| ResolveError::parse(work, "no sale date found"))?;

    Ok(ProductPage {
        name,
        circle,
        image_url,
        voice_actors,
        genres,
        sale_date,
    })
}

/// Applies the chobit embed answer (JSONP) to a scraped page.
///
/// Audio works get chobit's thumbnail as cover, and chobit's work name
/// replaces the page title when it is a substring of it (page titles often
/// carry promotional text).
fn apply_chobit(work: &WorkNumber, page: &mut ProductPage, body: &str) -> Result<(), ResolveError> {
    let json = match (body.find('('), body.rfind(')')) {
        (Some(start), Some(end)) if start < end => &body[start + 1..end],
        _ => return Err(ResolveError::parse(work, "unable to extract metadata from chobit")),
    };
    let embed: ChobitEmbed = serde_json::from_str(json)
        .map_err(|e| ResolveError::parse(work, format!("unable to extract metadata from chobit: {e}")))?;

    if embed.count == 0 {
        return Ok(());
    }
    if let Some(chobit) = embed.works.first() {
        if chobit.file_type == "audio" && !chobit.thumb.is_empty() {
            page.image_url = chobit
                .thumb
                .replacen("media.dlsite.com/chobit", "file.chobit.cc", 1);
        }
        if !chobit.work_name.is_empty() && page.name.contains(&chobit.work_name) {
            page.name = chobit.work_name.clone();
        }
    }
    Ok(())
}

fn absolute_url(raw: &str) -> Option<String> {
    let base = Url::parse(SITE_ROOT).ok()?;
    base.join(raw).ok().map(String::from)
}
