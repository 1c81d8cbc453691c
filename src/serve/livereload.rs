// src/serve/livereload.rs

//! The browser side of live reload.

/// Route of the Server-Sent Events stream.
pub const EVENTS_PATH: &str = "/__assetflow/events";

/// Route of the client script.
pub const SCRIPT_PATH: &str = "/__assetflow/livereload.js";

/// Subscribes to the event stream. `inject` events re-fetch matching
/// stylesheets in place, `full` events reload the page and `error` events
/// are logged to the console.
pub const CLIENT_SCRIPT: &str = r#"(function () {
  if (!window.EventSource) { return; }
  var source = new EventSource("/__assetflow/events");

  function matches(href, paths) {
    if (paths.length === 0) { return true; }
    var clean = href.split("?")[0];
    return paths.some(function (p) { return clean.slice(-p.length) === p || "/" + clean === p; });
  }

  source.onmessage = function (message) {
    var event = JSON.parse(message.data);
    if (event.type === "error") {
      console.error("[assetflow] " + event.task + ": " + event.message);
      return;
    }
    if (event.kind === "inject") {
      var links = document.querySelectorAll('link[rel="stylesheet"]');
      Array.prototype.forEach.call(links, function (link) {
        var href = link.getAttribute("href") || "";
        if (matches(href, event.paths)) {
          link.setAttribute("href", href.split("?")[0] + "?assetflow=" + Date.now());
        }
      });
      return;
    }
    window.location.reload();
  };
})();
"#;

/// Insert the client script tag before the last `</body>`, or append it when
/// the document has none.
pub fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{SCRIPT_PATH}"></script>"#);
    let lower = html.to_ascii_lowercase();

    match lower.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..idx]);
            out.push_str(&tag);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}
