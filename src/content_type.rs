//! MIME inference from file extensions.

/// The `Content-Type` header value for a served file path.
///
/// Text-ish types get `; charset=utf-8` appended: everything under
/// `text/`, plus the `application/*` types browsers treat as text
/// (JSON, JavaScript, XML, XHTML, form encoding).
pub fn content_type_for(path: &str) -> String {
    let mime = mime_for(path);
    if needs_charset(mime) {
        format!("{mime}; charset=utf-8")
    } else {
        mime.to_string()
    }
}

fn mime_for(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "js" | "mjs" | "cjs" | "jsx" => "text/javascript",
        "ts" | "mts" | "tsx" => "text/typescript",
        "css" => "text/css",
        "html" | "htm" => "text/html",
        "md" | "markdown" => "text/markdown",
        "txt" | "text" | "license" => "text/plain",
        "csv" => "text/csv",
        "yaml" | "yml" => "text/yaml",
        "json" | "map" => "application/json",
        "xml" => "application/xml",
        "xhtml" => "application/xhtml+xml",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

fn needs_charset(mime: &str) -> bool {
    mime.starts_with("text/")
        || matches!(
            mime,
            "application/json"
                | "application/javascript"
                | "application/xml"
                | "application/xhtml+xml"
                | "application/x-www-form-urlencoded"
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn javascript_is_text_with_charset() {
        assert_eq!(content_type_for("dist/js/uikit.js"), "text/javascript; charset=utf-8");
    }

    #[test]
    fn json_gets_charset() {
        assert_eq!(content_type_for("package.json"), "application/json; charset=utf-8");
    }

    #[test]
    fn binary_types_do_not() {
        assert_eq!(content_type_for("logo.png"), "image/png");
        assert_eq!(content_type_for("mod.wasm"), "application/wasm");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        assert_eq!(content_type_for("data.bin"), "application/octet-stream");
        assert_eq!(content_type_for("no_extension"), "application/octet-stream");
    }

    #[test]
    fn extension_match_is_case_blind() {
        assert_eq!(content_type_for("README.MD"), "text/markdown; charset=utf-8");
    }
}
