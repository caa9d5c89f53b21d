//! RSS/Atom feed parsing, dispatched when the sitemap URL path contains
//! `rss`/`feed` (§4.7).

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::errors::PipelineError;
use crate::models::UrlRecord;

/// # Errors
/// Returns [`PipelineError::Parse`] if the feed is not well-formed XML.
/// Unlike [`super::xml::parse_xml_sitemap`], RSS/Atom feeds do not apply
/// the resilience ladder — malformed feeds are rarer and less tolerant of
/// structural guessing since `<link>` elements carry real semantic weight
/// beyond URL extraction in other feed contexts. `url_cap` bounds memory
/// the same way it does for every other sitemap format (§4.7).
pub fn parse_rss_feed(bytes: &[u8], url_cap: usize) -> Result<Vec<UrlRecord>, PipelineError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| PipelineError::Parse(format!("RSS/Atom feed was not valid UTF-8: {e}")))?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut urls = Vec::new();
    let mut current_tag: Vec<u8> = Vec::new();
    let mut current_title: Option<String> = None;
    let mut atom_link_href: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.name().as_ref().to_vec();
                if name == b"link" {
                    // Atom: <link href="..."/>
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"href" {
                            atom_link_href = Some(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                    }
                }
                current_tag = name;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| PipelineError::Parse(e.to_string()))?.into_owned();
                match current_tag.as_slice() {
                    // RSS: <link>https://...</link> as text content
                    b"link" => atom_link_href = Some(text),
                    b"title" => current_title = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name().as_ref().to_vec();
                if name == b"item" || name == b"entry" {
                    if let Some(link) = atom_link_href.take() {
                        if urls.len() < url_cap {
                            let mut record = UrlRecord::new(link);
                            if let Some(title) = current_title.take() {
                                record.metadata.insert("title".into(), title);
                            }
                            urls.push(record);
                        }
                    }
                    current_title = None;
                }
                current_tag.clear();
                if urls.len() >= url_cap {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(PipelineError::Parse(format!("RSS/Atom parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rss_item_links() {
        let rss = r#"<rss><channel>
            <item><title>Super Mario Bros</title><link>https://example.com/games/super-mario-bros</link></item>
        </channel></rss>"#;
        let urls = parse_rss_feed(rss.as_bytes(), 100_000).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].metadata.get("title").unwrap(), "Super Mario Bros");
    }

    #[test]
    fn parses_atom_entry_links() {
        let atom = r#"<feed>
            <entry><title>Tetris</title><link href="https://example.com/tetris-classic"/></entry>
        </feed>"#;
        let urls = parse_rss_feed(atom.as_bytes(), 100_000).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].url, "https://example.com/tetris-classic");
    }

    #[test]
    fn respects_per_sitemap_url_cap() {
        let mut rss = String::from("<rss><channel>");
        for i in 0..10 {
            rss.push_str(&format!("<item><link>https://example.com/{i}</link></item>"));
        }
        rss.push_str("</channel></rss>");
        let urls = parse_rss_feed(rss.as_bytes(), 3).unwrap();
        assert_eq!(urls.len(), 3);
    }
}
