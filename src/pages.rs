//! Server-rendered pages. The surface is small enough that plain string
//! templates beat pulling in a template engine.

pub struct IndexPage<'a> {
    pub error: Option<&'a str>,
    pub result_image: Option<&'a str>,
    pub vehicle_count: u32,
}

impl Default for IndexPage<'_> {
    fn default() -> Self {
        Self {
            error: None,
            result_image: None,
            vehicle_count: 0,
        }
    }
}

const STYLE: &str = "\
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }\
.error { color: #b00020; border: 1px solid #b00020; padding: 0.5rem 1rem; }\
.result img { max-width: 100%; }\
nav a { margin-right: 1rem; }";

pub fn index(page: &IndexPage) -> String {
    let error_block = match page.error {
        Some(error) => format!(r#"<p class="error">{}</p>"#, escape(error)),
        None => String::new(),
    };

    let result_block = match page.result_image {
        Some(url) => format!(
            r#"<div class="result">
  <h2>Vehicles detected: {}</h2>
  <img src="{}" alt="Annotated result">
</div>"#,
            page.vehicle_count,
            escape(url)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Vehicle Detection</title>
<style>{STYLE}</style>
</head>
<body>
<nav><a href="/">Home</a><a href="/technical">Technical details</a></nav>
<h1>Vehicle Detection</h1>
<form method="post" action="/" enctype="multipart/form-data">
  <input type="file" name="image" accept=".png,.jpg,.jpeg">
  <button type="submit">Detect vehicles</button>
</form>
{error_block}
{result_block}
</body>
</html>"#
    )
}

pub fn technical() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Technical details - Vehicle Detection</title>
<style>{STYLE}</style>
</head>
<body>
<nav><a href="/">Home</a><a href="/technical">Technical details</a></nav>
<h1>Technical details</h1>
<p>Uploaded images are run through a YOLO-family object detection model
executed with ONNX Runtime. Detections belonging to the vehicle classes
(car, motorcycle, bus, truck) are kept, overlapping candidates are merged
with non-maximum suppression, and the surviving boxes are drawn onto the
image.</p>
<p>Accepted formats: PNG and JPEG. Uploads and annotated results are stored
in the static asset directory and served back under <code>/static</code>.</p>
</body>
</html>"#
    )
}

/// Minimal HTML escaping for text interpolated into pages.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_without_result_has_no_result_block() {
        let html = index(&IndexPage::default());
        assert!(html.contains("<form"));
        assert!(!html.contains("Vehicles detected"));
        assert!(!html.contains(r#"class="error""#));
    }

    #[test]
    fn index_renders_error_escaped() {
        let html = index(&IndexPage {
            error: Some("bad <input>"),
            ..Default::default()
        });
        assert!(html.contains("bad &lt;input&gt;"));
    }

    #[test]
    fn index_renders_result_and_count() {
        let html = index(&IndexPage {
            result_image: Some("/static/result_abc_car.jpg"),
            vehicle_count: 3,
            ..Default::default()
        });
        assert!(html.contains("Vehicles detected: 3"));
        assert!(html.contains("/static/result_abc_car.jpg"));
    }
}
