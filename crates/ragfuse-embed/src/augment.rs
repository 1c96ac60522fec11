use ragfuse_core::types::{meta_keys, Chunk};

/// Text actually sent to the embedder for a chunk: selected metadata lines
/// (title, category, tags) followed by the chunk content.
pub fn augment_for_embedding(chunk: &Chunk) -> String {
    let mut header = String::new();
    for (key, label) in [
        (meta_keys::TITLE, "Title"),
        (meta_keys::CATEGORY, "Category"),
        (meta_keys::TAGS, "Tags"),
    ] {
        if let Some(v) = chunk.metadata.get(key).filter(|v| !v.trim().is_empty()) {
            header.push_str(label);
            header.push_str(": ");
            header.push_str(v.trim());
            header.push('\n');
        }
    }
    if header.is_empty() {
        return chunk.content.clone();
    }
    format!("{header}\n{}", chunk.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragfuse_core::types::{ContentType, Meta};

    fn chunk(meta: &[(&str, &str)]) -> Chunk {
        Chunk {
            id: "id".into(),
            doc_id: "d".into(),
            content: "Body text".into(),
            chunk_index: 0,
            total_chunks: 1,
            content_type: ContentType::Narrative,
            has_previous: false,
            has_next: false,
            metadata: meta.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<Meta>(),
        }
    }

    #[test]
    fn no_metadata_keeps_content() {
        assert_eq!(augment_for_embedding(&chunk(&[("source", "a.md")])), "Body text");
    }

    #[test]
    fn header_lines_are_ordered() {
        let c = chunk(&[("tags", "db, perf"), ("title", "Tuning"), ("category", "ops")]);
        assert_eq!(
            augment_for_embedding(&c),
            "Title: Tuning\nCategory: ops\nTags: db, perf\n\nBody text"
        );
    }
}
