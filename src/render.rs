//! Output rendering: a static right-to-left HTML page, or JSON.
//!
//! Rendering is pure presentation over a finished [`Digest`]; nothing here
//! reorders, filters, or reinterprets articles.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::digest::{Category, Digest};
use crate::source::Article;

const PAGE_TITLE: &str = "گزیده اخبار";

const STYLE: &str = r#"
  body { font-family: Tahoma, 'Segoe UI', sans-serif; background: #f2f2f2; margin: 0; padding: 20px; direction: rtl; }
  h1 { text-align: center; color: #003366; font-size: 32px; margin-bottom: 40px; }
  .grid { display: grid; grid-template-columns: repeat(4, 1fr); gap: 24px; }
  .category { background: #fff; border-radius: 10px; box-shadow: 0 2px 8px rgba(0,0,0,0.05); overflow-y: auto; max-height: 85vh; display: flex; flex-direction: column; }
  .category-title { background: #003366; color: #fff; font-size: 22px; font-weight: bold; padding: 14px 10px; text-align: center; position: sticky; top: 0; }
  .article { border-bottom: 1px solid #ddd; padding: 14px 10px; background: #fafafa; border-radius: 4px; margin: 10px; }
  .article img { width: 100%; max-height: 160px; object-fit: cover; border-radius: 5px; margin-bottom: 10px; }
  .title { font-size: 18px; font-weight: 700; color: #0056b3; text-decoration: none; display: block; margin-bottom: 8px; }
  .desc { font-size: 14px; color: #333; margin-bottom: 6px; line-height: 1.6; }
  .date, .source { font-size: 12px; color: #777; margin-top: 4px; }
  .empty { color: #999; text-align: center; padding: 20px; }
"#;

/// Render the digest as a complete HTML document.
pub fn html(digest: &Digest) -> String {
    let mut out = String::with_capacity(16 * 1024);
    out.push_str("<!DOCTYPE html>\n<html lang=\"fa\" dir=\"rtl\">\n<head>\n");
    out.push_str("<meta charset=\"UTF-8\">\n");
    out.push_str(&format!("<title>{PAGE_TITLE}</title>\n"));
    out.push_str(&format!("<style>{STYLE}</style>\n"));
    out.push_str("</head>\n<body>\n");
    out.push_str(&format!("<h1>{PAGE_TITLE}</h1>\n"));
    out.push_str("<div class=\"grid\">\n");

    for category in digest.categories() {
        render_category(&mut out, category);
    }

    out.push_str("</div>\n</body>\n</html>\n");
    out
}

fn render_category(out: &mut String, category: &Category) {
    out.push_str("<div class=\"category\">\n");
    out.push_str(&format!(
        "<div class=\"category-title\">{}</div>\n",
        encode_text(&category.name)
    ));
    if category.articles.is_empty() {
        out.push_str("<div class=\"empty\">خبری یافت نشد</div>\n");
    }
    for article in &category.articles {
        render_article(out, article);
    }
    out.push_str("</div>\n");
}

fn render_article(out: &mut String, article: &Article) {
    out.push_str("<div class=\"article\">\n");
    if let Some(image) = &article.image_url {
        out.push_str(&format!(
            "<img src=\"{}\" alt=\"تصویر\" loading=\"lazy\">\n",
            encode_double_quoted_attribute(image)
        ));
    }
    out.push_str(&format!(
        "<a class=\"title\" href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a>\n",
        encode_double_quoted_attribute(&article.link),
        encode_text(&article.title)
    ));
    out.push_str(&format!(
        "<div class=\"date\">{}</div>\n",
        encode_text(&article.display_date)
    ));
    out.push_str(&format!(
        "<div class=\"source\">📌 {}</div>\n",
        encode_text(&article.source)
    ));
    if !article.description.is_empty() {
        out.push_str(&format!(
            "<div class=\"desc\">{}</div>\n",
            encode_text(&article.description)
        ));
    }
    out.push_str("</div>\n");
}

/// Render the digest as pretty-printed JSON.
pub fn json(digest: &Digest) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::DigestBuilder;
    use crate::source::article::tests::{make_article, tehran};

    fn sample() -> Digest {
        let mut builder = DigestBuilder::new(["اقتصاد", "خالی"]);
        builder.push(Article {
            title: "Rates <rise> & fall".to_string(),
            description: "plain \"quoted\" text".to_string(),
            display_date: "دوشنبه، ۱۱ دی ۱۴۰۲ ⏰ ۱۵:۳۰".to_string(),
            image_url: Some("https://img.example/a.jpg?x=1&y=\"2\"".to_string()),
            source: "ایرنا".to_string(),
            category: "اقتصاد".to_string(),
            ..make_article("https://news.example/a?b=1&c=2", Some(tehran(2024, 1, 1, 15, 30)))
        });
        builder.finalize()
    }

    #[test]
    fn html_contains_categories_in_order() {
        let page = html(&sample());
        let first = page.find("اقتصاد").unwrap();
        let second = page.find("خالی").unwrap();
        assert!(first < second);
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("dir=\"rtl\""));
    }

    #[test]
    fn html_escapes_text_and_attributes() {
        let page = html(&sample());
        assert!(page.contains("Rates &lt;rise&gt; &amp; fall"));
        assert!(page.contains("href=\"https://news.example/a?b=1&amp;c=2\""));
        assert!(page.contains("&quot;2&quot;"));
        assert!(!page.contains("<rise>"));
    }

    #[test]
    fn html_article_fields_are_one_per_line() {
        let page = html(&sample());
        assert!(page.contains("<h1>گزیده اخبار</h1>\n"));
        assert!(page.contains(
            "<div class=\"date\">دوشنبه، ۱۱ دی ۱۴۰۲ ⏰ ۱۵:۳۰</div>\n<div class=\"source\">📌 ایرنا</div>\n"
        ));
        assert!(page.ends_with("</div>\n</body>\n</html>\n"));
    }

    #[test]
    fn html_marks_empty_categories() {
        let page = html(&sample());
        assert!(page.contains("خبری یافت نشد"));
    }

    #[test]
    fn html_omits_missing_image() {
        let mut builder = DigestBuilder::new(["c"]);
        builder.push(Article {
            category: "c".to_string(),
            ..make_article("https://news.example/x", None)
        });
        let page = html(&builder.finalize());
        assert!(!page.contains("<img"));
    }

    #[test]
    fn json_has_categories_and_articles() {
        let value: serde_json::Value = serde_json::from_str(&json(&sample()).unwrap()).unwrap();
        let categories = value["categories"].as_array().unwrap();

        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0]["name"], "اقتصاد");
        assert_eq!(categories[0]["articles"][0]["source"], "ایرنا");
        assert_eq!(
            categories[0]["articles"][0]["timestamp"],
            "2024-01-01T15:30:00+03:30"
        );
        assert!(categories[1]["articles"].as_array().unwrap().is_empty());
    }
}
