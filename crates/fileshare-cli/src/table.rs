//! Table rendering for the `list` command.

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use fileshare_catalog::FileMetadata;

use crate::progress::format_bytes;

/// Render a listing as the original's table: index, publisher, name, size,
/// `held/total` fragment count, fingerprint, status, with a trailing count.
#[must_use]
pub fn render_listing(files: &[FileMetadata]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "#",
        "Publisher",
        "Name",
        "Size",
        "Fragments",
        "Fingerprint",
        "Status",
    ]);

    for (i, f) in files.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&f.publisher),
            Cell::new(&f.name),
            Cell::new(format_bytes(f.size)),
            Cell::new(format!("{}/{}", f.held_fragments.len(), f.fragment_count)),
            Cell::new(&f.fingerprint),
            Cell::new(f.status.to_string()),
        ]);
    }

    let mut out = table.to_string();
    out.push_str(&format!("\n{} file(s)", files.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileshare_catalog::Status;

    #[test]
    fn renders_one_row_per_file_plus_footer() {
        let files = vec![FileMetadata {
            name: "a.bin".into(),
            file_path: "/tmp/a.bin".into(),
            publisher: "me".into(),
            fingerprint: "abc123".into(),
            size: 2048,
            fragment_count: 1,
            held_fragments: vec![0],
            status: Status::Seeding,
        }];

        let rendered = render_listing(&files);
        assert!(rendered.contains("a.bin"));
        assert!(rendered.contains("1/1"));
        assert!(rendered.contains("1 file(s)"));
    }

    #[test]
    fn empty_listing_still_shows_footer() {
        let rendered = render_listing(&[]);
        assert!(rendered.contains("0 file(s)"));
    }
}
