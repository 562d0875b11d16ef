use crate::pages;
use axum::response::Html;

pub async fn technical_page() -> Html<String> {
    Html(pages::technical())
}
