#[cfg(test)]
mod tests {
    use crate::citations::{CitationsData, append_citations, render_citations};
    use tempfile::TempDir;

    const THREE_URLS: &str = r#"{
        "url_to_unified_index": {
            "https://a.example": 2,
            "https://b.example": 1,
            "https://c.example": "3"
        },
        "url_to_info": {
            "https://a.example": {
                "url": "https://a.example",
                "title": "Alpha",
                "description": "About alpha",
                "snippets": ["s1", "s2", "s3", "s4", "s5"]
            },
            "https://b.example": {
                "title": "Beta",
                "description": "About beta",
                "snippets": ["only"]
            },
            "https://c.example": {
                "title": "Gamma",
                "description": "About gamma",
                "snippets": []
            }
        }
    }"#;

    #[test]
    fn test_render_orders_by_citation_number() {
        let data = CitationsData::from_json(THREE_URLS).unwrap();
        let markdown = render_citations(&data);

        assert!(markdown.starts_with("## Citations\n\n"));
        let first = markdown.find("### [1] [Beta](https://b.example)").unwrap();
        let second = markdown.find("### [2] [Alpha](https://a.example)").unwrap();
        let third = markdown.find("### [3] [Gamma](https://c.example)").unwrap();
        assert!(first < second);
        assert!(second < third);
    }

    #[test]
    fn test_render_truncates_snippets_to_three() {
        let data = CitationsData::from_json(THREE_URLS).unwrap();
        let markdown = render_citations(&data);

        assert!(markdown.contains("- s1\n\n- s2\n\n- s3\n\n---"));
        assert!(!markdown.contains("- s4"));
        assert!(!markdown.contains("- s5"));
        // 没有片段的条目不输出片段标题
        assert!(markdown.contains("About gamma\n\n---\n\n"));
        assert_eq!(markdown.matches("**Relevant Snippets:**").count(), 2);
    }

    #[test]
    fn test_render_exact_entry_format() {
        let data = CitationsData::from_json(
            r#"{
                "url_to_unified_index": {"https://x.example": 7},
                "url_to_info": {
                    "https://x.example": {"title": "X", "description": "Desc", "snippets": ["one"]}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            render_citations(&data),
            "## Citations\n\n### [7] [X](https://x.example)\n\nDesc\n\n**Relevant Snippets:**\n\n- one\n\n---\n\n"
        );
    }

    #[test]
    fn test_render_defaults_for_missing_fields() {
        let data = CitationsData::from_json(
            r#"{
                "url_to_unified_index": {},
                "url_to_info": {"https://bare.example": {}}
            }"#,
        )
        .unwrap();
        let markdown = render_citations(&data);

        assert!(markdown.contains("### [0] [Untitled](https://bare.example)"));
        assert!(markdown.contains("No description available"));
        assert!(!markdown.contains("Relevant Snippets"));
    }

    #[test]
    fn test_ties_keep_source_order() {
        let data = CitationsData::from_json(
            r#"{
                "url_to_info": {
                    "https://z.example": {"title": "Z"},
                    "https://m.example": {"title": "M"},
                    "https://a.example": {"title": "A"}
                }
            }"#,
        )
        .unwrap();
        let markdown = render_citations(&data);

        let z = markdown.find("[Z]").unwrap();
        let m = markdown.find("[M]").unwrap();
        let a = markdown.find("[A]").unwrap();
        assert!(z < m && m < a);
    }

    #[test]
    fn test_citation_number_parsing() {
        let data = CitationsData::from_json(
            r#"{
                "url_to_unified_index": {"n": 4, "s": " 9 ", "bad": "x", "null": null},
                "url_to_info": {}
            }"#,
        )
        .unwrap();

        assert_eq!(data.citation_number("n"), 4);
        assert_eq!(data.citation_number("s"), 9);
        assert_eq!(data.citation_number("bad"), 0);
        assert_eq!(data.citation_number("null"), 0);
        assert_eq!(data.citation_number("missing"), 0);
    }

    #[test]
    fn test_float_citation_numbers_are_truncated() {
        let data = CitationsData::from_json(
            r#"{
                "url_to_unified_index": {"https://a": 2.0, "https://b": 1, "https://c": 3.7},
                "url_to_info": {
                    "https://a": {"title": "A"},
                    "https://b": {"title": "B"},
                    "https://c": {"title": "C"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(data.citation_number("https://a"), 2);
        assert_eq!(data.citation_number("https://c"), 3);

        let rendered = render_citations(&data);
        let b = rendered.find("### [1] [B](https://b)").unwrap();
        let a = rendered.find("### [2] [A](https://a)").unwrap();
        let c = rendered.find("### [3] [C](https://c)").unwrap();
        assert!(b < a && a < c);
    }

    #[test]
    fn test_null_fields_keep_the_entry() {
        let data = CitationsData::from_json(
            r#"{
                "url_to_unified_index": {"https://a": 1, "https://b": 2},
                "url_to_info": {
                    "https://a": {"title": "A", "description": "ay", "snippets": ["x"]},
                    "https://b": {"title": null, "description": null, "snippets": null}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(data.url_to_info.len(), 2);
        assert!(data.url_to_info[1].1.snippets.is_empty());

        let rendered = render_citations(&data);
        assert!(rendered.contains(
            "### [2] [Untitled](https://b)\n\nNo description available\n\n---\n\n"
        ));
        assert!(rendered.contains("- x\n\n"));
    }

    #[test]
    fn test_append_citations_with_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("url_to_info.json"), THREE_URLS).unwrap();

        let result = append_citations("Article body".to_string(), temp_dir.path());

        assert!(result.starts_with("Article body\n\n## Citations\n\n"));
    }

    #[test]
    fn test_append_citations_missing_file() {
        let temp_dir = TempDir::new().unwrap();

        let result = append_citations("Article body".to_string(), temp_dir.path());

        assert_eq!(result, "Article body");
    }

    #[test]
    fn test_append_citations_malformed_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("url_to_info.json"), "{ not json").unwrap();

        let result = append_citations("Article body".to_string(), temp_dir.path());

        assert_eq!(result, "Article body");
    }

    #[test]
    fn test_append_citations_missing_info_key_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("url_to_info.json"),
            r#"{"url_to_unified_index": {}}"#,
        )
        .unwrap();

        let result = append_citations("Article body".to_string(), temp_dir.path());

        assert_eq!(result, "Article body");
    }
}
