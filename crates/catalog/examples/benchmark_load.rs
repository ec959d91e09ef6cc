use catalog::Catalog;
use std::path::Path;
use std::time::Instant;

fn main() {
    let path = Path::new("data/courses.jsonl");

    println!("Loading course catalog...\n");

    let start = Instant::now();
    let catalog = Catalog::load_from_file(path)
        .expect("Failed to load catalog");
    let elapsed = start.elapsed();

    let stats = catalog.stats();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Courses: {}", stats.total_courses);
    println!("Embedding dimension: {}", stats.embedding_dimension);
    println!("Departments: {}", stats.departments);
    for (level, count) in &stats.courses_per_level {
        println!("  {}-level: {}", level, count);
    }
    println!("\nPerformance: {:.0} courses/second",
             stats.total_courses as f64 / elapsed.as_secs_f64());
}
