use std::path::Path;

use anyhow::Context;
use tariffscan_core::{ExtractionResult, Page};
use tariffscan_ocr::{ScanConfig, ScanSession};
use tariffscan_storage::{DbPool, ScanRecord};

use crate::commit::{CommitOutcome, CommitTrigger, Committer};

pub fn load_page(path: &Path) -> anyhow::Result<Page> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// One-shot extraction of a recorded page, bypassing the stabilizer.
pub async fn extract(
    config: &ScanConfig,
    page_path: &Path,
    committer: Option<&mut Committer>,
) -> anyhow::Result<ExtractionResult> {
    let page = load_page(page_path)?;
    let result = ScanSession::new(config).extract(&page);
    println!("{}", result.display_text());

    if let Some(c) = committer {
        match c.commit(&result, CommitTrigger::Manual).await? {
            CommitOutcome::Saved(n) => println!("\nSaved {n} item(s)."),
            CommitOutcome::Duplicate => println!("\nAlready saved."),
            CommitOutcome::NothingToSave => println!("\nHS code / item name not detected yet."),
        }
    }
    Ok(result)
}

pub async fn list(pool: &DbPool, limit: i64) -> anyhow::Result<()> {
    let records = tariffscan_storage::latest_scans(pool, limit).await?;
    print_records(&records);
    Ok(())
}

pub async fn search(pool: &DbPool, query: &str) -> anyhow::Result<()> {
    let records = tariffscan_storage::search_scans(pool, query).await?;
    print_records(&records);
    Ok(())
}

pub async fn clear(committer: &mut Committer) -> anyhow::Result<()> {
    let removed = committer.clear().await?;
    println!("Removed {removed} scan(s).");
    Ok(())
}

fn print_records(records: &[ScanRecord]) {
    if records.is_empty() {
        println!("No scans.");
        return;
    }
    for r in records {
        println!(
            "#{:<5} {}  {:<10}  {}",
            r.id,
            r.created_at.format("%Y-%m-%d %H:%M:%S"),
            r.hs_code,
            r.item_name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const PAGE: &str = r#"{"blocks":[{"lines":[
        {"text":"31","box":{"left":100,"top":100,"right":140,"bottom":130}},
        {"text":"البند التعريفي","box":{"left":900,"top":160,"right":1200,"bottom":190}},
        {"text":"64039900","box":{"left":900,"top":220,"right":1100,"bottom":250}},
        {"text":"أحذية رياضية جلدية","box":{"left":200,"top":300,"right":700,"bottom":330}}
    ]}]}"#;

    fn page_file(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[tokio::test]
    async fn extract_without_saving() {
        let f = page_file(PAGE);
        let result = extract(&ScanConfig::default(), f.path(), None).await.unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].hs_code, "64039900");
        assert_eq!(result.items[0].item_name, "أحذية رياضية جلدية");
    }

    #[tokio::test]
    async fn extract_with_save_persists_items() {
        let dir = TempDir::new().unwrap();
        let pool = tariffscan_storage::create_db(&dir.path().join("scans.db")).await.unwrap();
        let mut c = Committer::new(pool);
        let f = page_file(PAGE);

        extract(&ScanConfig::default(), f.path(), Some(&mut c)).await.unwrap();
        extract(&ScanConfig::default(), f.path(), Some(&mut c)).await.unwrap();

        assert_eq!(tariffscan_storage::count_scans(c.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn text_only_page_uses_text_parser() {
        let f = page_file(r#"{"raw_text":"بيان جمركي\nتسمية السلعة\nمفرش طاولة قطني\n63026000"}"#);
        let result = extract(&ScanConfig::default(), f.path(), None).await.unwrap();
        assert_eq!(result.items[0].item_name, "مفرش طاولة قطني");
        assert_eq!(result.items[0].hs_code, "63026000");
    }

    #[test]
    fn malformed_page_reports_path() {
        let f = page_file("{");
        let err = load_page(f.path()).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }
}
