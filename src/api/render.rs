//! HTML fragment rendering for the queue UI.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>doujindl</title>
</head>
<body>
  <h1>doujindl</h1>
  <form id="add-form" method="post" action="/do-the-thing">
    <input type="text" name="AlbumID" placeholder="Album ID" required>
    <button type="submit">Queue download</button>
  </form>
  <div id="queue">Nothing to see here...</div>
  <script>
    const queue = document.getElementById('queue');

    document.getElementById('add-form').addEventListener('submit', async (ev) => {
      ev.preventDefault();
      const resp = await fetch('/do-the-thing', {
        method: 'POST',
        body: new URLSearchParams(new FormData(ev.target)),
      });
      if (resp.ok) ev.target.reset();
    });

    const events = new EventSource('/stream');
    events.addEventListener('list-reload', (ev) => { queue.innerHTML = ev.data; });
  </script>
</body>
</html>
"#;

/// One pending-list entry, addressable for removal by its index.
pub fn task_item(album_id: &str, index: usize) -> String {
    format!(
        r#"<div class="queue-item" data-index="{index}">{} <a href="/remove-queue-element?index={index}">remove</a></div>"#,
        escape_html(album_id),
    )
}

/// The whole pending list as a fragment.
pub fn task_list(items: &[String]) -> String {
    if items.is_empty() {
        return "Nothing to see here...".to_string();
    }

    items
        .iter()
        .enumerate()
        .map(|(index, album_id)| task_item(album_id, index))
        .collect()
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());

    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_carries_id_and_remove_link() {
        let html = task_item("12345", 2);
        assert!(html.contains("12345"));
        assert!(html.contains("/remove-queue-element?index=2"));
    }

    #[test]
    fn empty_list_renders_placeholder() {
        assert_eq!(task_list(&[]), "Nothing to see here...");
    }

    #[test]
    fn list_renders_every_item_in_order() {
        let items = vec!["a".to_string(), "b".to_string()];
        let html = task_list(&items);

        let a = html.find("data-index=\"0\"").unwrap();
        let b = html.find("data-index=\"1\"").unwrap();
        assert!(a < b);
    }

    #[test]
    fn album_ids_are_html_escaped() {
        let html = task_item("<script>alert(1)</script>", 0);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
