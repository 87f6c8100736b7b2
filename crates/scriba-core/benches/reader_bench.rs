use criterion::{Criterion, black_box, criterion_group, criterion_main};
use scriba_core::reader::crf::read_crf_str;
use scriba_core::reader::xml::{XmlDialect, read_xml_str};

fn synthetic_tei(sentences: usize) -> String {
    let mut doc = String::from("<TEI>");
    for i in 0..sentences {
        doc.push_str(&format!(
            "<p>sentence {i} mentions <rs type=\"insult\">a rude expression</rs> \
             and later <rs type=\"threat\">a serious threat here</rs> as well.</p>"
        ));
    }
    doc.push_str("</TEI>");
    doc
}

fn synthetic_crf(sentences: usize) -> String {
    let mut out = String::new();
    for i in 0..sentences {
        out.push_str(&format!("John{i} LINESTART INITCAP NODIGIT I-<author>\n"));
        out.push_str("Smith LINEIN INITCAP NODIGIT <author>\n");
        out.push_str(", LINEIN PUNCT NODIGIT <other>\n");
        out.push_str("2001 LINEIN NOCAPS ALLDIGIT I-<date>\n\n");
    }
    out
}

fn bench_readers(c: &mut Criterion) {
    let tei = synthetic_tei(100);
    let crf = synthetic_crf(100);

    c.bench_function("xml_span_projection_100", |b| {
        b.iter(|| read_xml_str(black_box(&tei), XmlDialect::Tei).unwrap());
    });

    c.bench_function("crf_matrix_100", |b| {
        b.iter(|| read_crf_str(black_box(&crf)).unwrap());
    });
}

criterion_group!(benches, bench_readers);
criterion_main!(benches);
