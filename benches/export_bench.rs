use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use quotepress::assembler::{ImageEncoding, PageImage};
use quotepress::{PageGeometry, PageSlicer, PdfAssembler, SourceBitmap};

/// A4 preview at scale 2, roughly four pages tall
fn tall_bitmap() -> SourceBitmap {
    let img = RgbImage::from_fn(1588, 9000, |x, y| {
        if (y / 28) % 2 == 0 && x % 14 < 10 {
            Rgb([17, 24, 39])
        } else {
            Rgb([255, 255, 255])
        }
    });
    SourceBitmap::from_rgb(img, "invoice-preview").expect("non-empty bitmap")
}

fn bench_slice_plan(c: &mut Criterion) {
    let slicer = PageSlicer::new(PageGeometry::a4());
    c.bench_function("slice_plan_tall", |b| {
        b.iter(|| slicer.plan(black_box(1588), black_box(90_000)).unwrap())
    });
}

fn bench_assemble(c: &mut Criterion) {
    let bitmap = tall_bitmap();
    let slicer = PageSlicer::new(PageGeometry::a4());
    let pages: Vec<PageImage> = slicer
        .slice(&bitmap)
        .unwrap()
        .into_iter()
        .map(|slice| PageImage {
            pixels: bitmap.crop(&slice).unwrap(),
            slice,
        })
        .collect();

    let mut group = c.benchmark_group("assemble");
    group.sample_size(10);
    group.bench_function("lossless", |b| {
        let assembler = PdfAssembler::new(PageGeometry::a4(), ImageEncoding::Lossless);
        b.iter(|| assembler.assemble(black_box(&pages)).unwrap())
    });
    group.bench_function("jpeg_92", |b| {
        let assembler = PdfAssembler::new(PageGeometry::a4(), ImageEncoding::Jpeg(92));
        b.iter(|| assembler.assemble(black_box(&pages)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_slice_plan, bench_assemble);
criterion_main!(benches);
