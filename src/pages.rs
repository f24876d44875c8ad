//! Minimal HTML shells for the page routes.
//!
//! The administration UI itself is rendered by the frontend; these pages only
//! give the guarded routes and the redirect targets something to answer with.

use axum::{Router, extract::OriginalUri, response::Html, routing::get};

pub fn router() -> Router {
    Router::new()
        .route("/auth", get(login_page))
        .route("/notallowed", get(suspended_page))
        .fallback(app_shell)
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html lang=\"fr\"><head><meta charset=\"utf-8\"><title>{} | GoodFood</title></head><body>{}</body></html>",
        title, body
    ))
}

async fn login_page() -> Html<String> {
    page("Connexion", "<main id=\"login\"></main>")
}

async fn suspended_page() -> Html<String> {
    page(
        "Compte suspendu",
        "<main id=\"suspended\"><p>Votre compte restaurateur est suspendu.</p></main>",
    )
}

async fn app_shell(OriginalUri(uri): OriginalUri) -> Html<String> {
    let path = uri.path().replace(['<', '>', '"', '&'], "");
    page(
        "Espace restaurateur",
        &format!("<main id=\"app\" data-path=\"{}\"></main>", path),
    )
}
