//! The request form served at `/`

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Sign a document</title>
    <style>
        form { margin-bottom: 1.5em; }
        form input { display: block; margin-bottom: 0.5em; }
    </style>
</head>
<body>
    <form id="sign-form">
        <label for="name">Name</label>
        <input id="name" name="name" type="text" required>
        <label for="email">Email</label>
        <input id="email" name="email" type="email" required>
        <label for="company">Company</label>
        <input id="company" name="company" type="text">
        <button type="submit">Submit</button>
    </form>
    <form action="/listStatus" method="get">
        <label for="envelopeId">Envelope ID</label>
        <input id="envelopeId" name="envelopeId" type="text" required>
        <button type="submit">Check Status</button>
    </form>
    <form action="/listStatusChanges" method="get">
        <label for="fromDate">From Date</label>
        <input id="fromDate" name="fromDate" type="date" required>
        <label for="toDate">To Date</label>
        <input id="toDate" name="toDate" type="date" required>
        <button type="submit">Check Status Changes</button>
    </form>
    <p id="sign-error" role="alert"></p>
    <script>
        document.getElementById("sign-form").addEventListener("submit", async (event) => {
            event.preventDefault();
            const form = new FormData(event.target);
            const response = await fetch("/form", {
                method: "POST",
                headers: { "Content-Type": "application/json" },
                body: JSON.stringify({ name: form.get("name"), email: form.get("email") }),
            });
            const body = await response.json();
            if (response.ok) {
                window.location.href = body.redirectUrl;
            } else {
                document.getElementById("sign-error").textContent = body.error;
            }
        });
    </script>
</body>
</html>
"#;

/// Handle GET /
pub fn index_page() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(Full::new(Bytes::from_static(INDEX_HTML.as_bytes())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}
