//! PDF adapter integration: full anonymize -> save -> reload -> deanonymize
//! cycles over documents built in memory.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use docanon::pdf::{anonymize_pdf, deanonymize_pdf, open_pdf, page_text};
use docanon::{AnonymizeOptions, AnonymizeSession, Mapping, PageRewriter, TierRecord};

fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

fn text_ops(lines: &[&str]) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Real(11.0)],
        ),
        Operation::new("Td", vec![Object::Real(72.0), Object::Real(720.0)]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            ops.push(Operation::new(
                "Td",
                vec![Object::Real(0.0), Object::Real(-14.0)],
            ));
        }
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(latin1(line), lopdf::StringFormat::Literal)],
        ));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

/// One page per entry of `pages`, all sharing a Helvetica resource.
fn build_pdf(pages: &[Vec<Operation>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for ops in pages {
        let encoded = Content {
            operations: ops.clone(),
        }
        .encode()
        .unwrap();
        let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), encoded)));
        let mut font_dict = Dictionary::new();
        font_dict.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(font_dict));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Dictionary(resources),
        });
        kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn all_text(doc: &Document) -> Vec<String> {
    doc.page_iter()
        .enumerate()
        .flat_map(|(i, page_id)| page_text(doc, page_id, i).unwrap())
        .collect()
}

fn tiers() -> Vec<TierRecord> {
    vec![TierRecord {
        name: Some("HUISSOUD".into()),
        first_name: Some("Louis".into()),
        address: Some("244 Montée du Mollard".into()),
        ..Default::default()
    }]
}

#[test]
fn pdf_round_trip_through_saved_files() {
    let bytes = build_pdf(&[text_ops(&[
        "Monsieur HUISSOUD Louis",
        "demeurant 244 Montée du Mollard",
    ])]);

    let mut doc = open_pdf(&bytes).unwrap();
    let mut session = AnonymizeSession::new(&tiers(), AnonymizeOptions::default());
    let rewriter = PageRewriter::new();
    let report = anonymize_pdf(&mut doc, &mut session, &rewriter).unwrap();
    assert_eq!(report.replaced, 2);
    assert!(report.failures.is_empty());
    let mapping = session.into_mapping();

    // Persist both halves of the state, then reload from disk.
    let dir = tempfile::tempdir().unwrap();
    let pdf_path = dir.path().join("anonymized.pdf");
    let mapping_path = dir.path().join("mapping.json");
    doc.save(&pdf_path).unwrap();
    std::fs::write(&mapping_path, serde_json::to_string(&mapping).unwrap()).unwrap();

    let mut reloaded = docanon::pdf::open_pdf_file(&pdf_path).unwrap();
    let texts = all_text(&reloaded);
    assert!(texts.contains(&"Monsieur NOM1 PRENOM1".to_string()));
    assert!(texts.contains(&"demeurant ADRESSE1".to_string()));
    assert!(texts.iter().all(|t| !t.contains("HUISSOUD")));
    assert!(texts.iter().all(|t| !t.contains("Mollard")));

    let wire: Mapping =
        serde_json::from_str(&std::fs::read_to_string(&mapping_path).unwrap()).unwrap();
    let report = deanonymize_pdf(&mut reloaded, &wire, &rewriter).unwrap();
    assert_eq!(report.replaced, 2);

    let texts = all_text(&reloaded);
    assert!(texts.contains(&"Monsieur HUISSOUD Louis".to_string()));
    assert!(texts.contains(&"demeurant 244 Montée du Mollard".to_string()));
}

#[test]
fn one_session_spans_every_page() {
    let bytes = build_pdf(&[
        text_ops(&["Dossier de Monsieur HUISSOUD"]),
        text_ops(&["Signé: HUISSOUD Louis"]),
    ]);

    let mut doc = open_pdf(&bytes).unwrap();
    let mut session = AnonymizeSession::new(&tiers(), AnonymizeOptions::default());
    let report = anonymize_pdf(&mut doc, &mut session, &PageRewriter::new()).unwrap();
    assert_eq!(report.pages, 2);

    let texts = all_text(&doc);
    // Same entity, same tag, on both pages; one mapping entry.
    assert!(texts.contains(&"Dossier de Monsieur NOM1".to_string()));
    assert!(texts.contains(&"Signé: NOM1 PRENOM1".to_string()));
    let mapping = session.into_mapping();
    assert_eq!(mapping.value_for_tag("NOM1"), Some("HUISSOUD"));
    assert_eq!(
        mapping.iter().filter(|&(_, v)| v == "HUISSOUD").count(),
        1
    );
}

#[test]
fn pattern_fallback_works_on_pages() {
    let bytes = build_pdf(&[text_ops(&["Contact: 06 12 34 56 78 / greffe@tribunal.fr"])]);

    let mut doc = open_pdf(&bytes).unwrap();
    let mut session = AnonymizeSession::new(&[], AnonymizeOptions::default());
    anonymize_pdf(&mut doc, &mut session, &PageRewriter::new()).unwrap();

    let texts = all_text(&doc);
    assert!(texts.contains(&"Contact: TEL1 / EMAIL1".to_string()));

    let mapping = session.into_mapping();
    let restored =
        docanon::Deanonymizer::new(&mapping).restore(&texts.join("\n"));
    assert!(restored.contains("06 12 34 56 78"));
    assert!(restored.contains("greffe@tribunal.fr"));
}
