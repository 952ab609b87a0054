use divan::{Bencher, black_box};
use treebank::{BuildOptions, GridFormat, GridReader, build_tree};

fn main() {
    divan::main();
}

/// `count` sentences of nested PPs, each with one secondary edge
fn generated_corpus(count: usize, depth: usize) -> String {
    let mut text = String::new();
    for sent in 0..count {
        text.push_str(&format!("#BOS {sent}\n"));
        for level in 0..depth {
            let parent = 500 + level;
            text.push_str(&format!("in\tin\tAPPR\t--\tAC\t{parent}\n"));
            text.push_str(&format!("Haus\tHaus\tNN\tNeut\tNK\t{parent}\n"));
        }
        text.push_str(&format!("schläft\tschlafen\tVVFIN\t--\tHD\t{}\tSB\t500\n", 500 + depth));
        for level in 0..depth {
            let num = 500 + level;
            text.push_str(&format!("#{num}\t--\tPP\t--\tMO\t{}\n", num + 1));
        }
        text.push_str(&format!("#{}\t--\tS\t--\t--\t0\n", 500 + depth));
        text.push_str(&format!("#EOS {sent}\n"));
    }
    text
}

#[divan::bench(args = [1, 8])]
fn normalize(bencher: Bencher, depth: usize) {
    let format = GridFormat::default();
    let text = generated_corpus(200, depth);
    bencher.bench_local(|| {
        for block in GridReader::from_string(&format, black_box(&text)) {
            black_box(format.normalize(&block.unwrap()).unwrap());
        }
    });
}

#[divan::bench(args = [1, 8])]
fn build_annotated(bencher: Bencher, depth: usize) {
    let format = GridFormat::default();
    let sentences: Vec<_> = GridReader::from_string(&format, &generated_corpus(200, depth))
        .map(|block| format.normalize(&block.unwrap()).unwrap())
        .collect();
    bencher.bench_local(|| {
        for sentence in &sentences {
            black_box(build_tree(black_box(sentence), BuildOptions::default()).unwrap());
        }
    });
}

#[divan::bench(args = [1, 8])]
fn build_duplicated(bencher: Bencher, depth: usize) {
    let format = GridFormat::default();
    let sentences: Vec<_> = GridReader::from_string(&format, &generated_corpus(200, depth))
        .map(|block| format.normalize(&block.unwrap()).unwrap())
        .collect();
    bencher.bench_local(|| {
        for sentence in &sentences {
            black_box(build_tree(black_box(sentence), BuildOptions::morph()).unwrap());
        }
    });
}
