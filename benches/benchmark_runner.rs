/// Benchmark runner for the engine.
///
/// Runs each script with analysis switched off (every operation generic) and on (typed
/// operations where types are known, constants folded).

extern crate kiln;

use kiln::runner::api::Engine;
use kiln::runner::config::EngineConfig;
use kiln::runner::ds::value::JsValue;
use std::time::{Duration, Instant};

fn generic_config() -> EngineConfig {
    EngineConfig::default()
        .with_narrow_types(false)
        .with_fold_constants(false)
}

/// Compile once, then run the script `iterations` times, each in a fresh realm.
fn run_benchmark(name: &str, code: &str, iterations: u32, config: EngineConfig) -> Duration {
    let script = match Engine::new(config.clone()).compile(code) {
        Ok(script) => script,
        Err(e) => panic!("Failed to compile benchmark {}: {}", name, e),
    };

    let start = Instant::now();

    for _ in 0..iterations {
        let mut engine = Engine::new(config.clone());
        if let Err(e) = engine.execute(&script) {
            panic!("Benchmark {} failed: {}", name, e);
        }
    }

    start.elapsed()
}

/// The completion value of `code`, or -1 when it is not a number.
fn completion(code: &str, config: EngineConfig) -> f64 {
    match Engine::new(config).run(code) {
        Ok(JsValue::Number(n)) => n,
        _ => -1.0,
    }
}

// ============================================================================
// Benchmark definitions
// ============================================================================

const BENCH_FIBONACCI: &str = r#"
function fib(n) {
    var a = 0;
    var b = 1;
    for (var i = 0; i < n; i = i + 1) {
        var temp = a;
        a = b;
        b = temp + b;
    }
    return a;
}
fib(20);
"#;

const BENCH_LOOP_SUM: &str = r#"
var sum = 0;
for (var i = 0; i < 10000; i = i + 1) {
    sum = sum + i;
}
sum;
"#;

const BENCH_NESTED_LOOPS: &str = r#"
var count = 0;
for (var i = 0; i < 100; i = i + 1) {
    for (var j = 0; j < 100; j = j + 1) {
        count = count + 1;
    }
}
count;
"#;

const BENCH_BITWISE: &str = r#"
var result = 0;
for (var i = 0; i < 1000; i = i + 1) {
    result = (result ^ i) & 0xFFFF;
}
result;
"#;

const BENCH_CONDITIONALS: &str = r#"
var count = 0;
for (var i = 0; i < 1000; i = i + 1) {
    if (i % 2 === 0) {
        count = count + 1;
    } else {
        count = count + 2;
    }
}
count;
"#;

const BENCH_ARITHMETIC: &str = r#"
function arith() {
    var result = 0;
    for (var i = 1; i < 1000; i = i + 1) {
        var x = i * 2;
        var y = i / 2;
        result = result + x - y;
    }
    return result;
}
arith();
"#;

const BENCH_FACTORIAL: &str = r#"
function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }
fact(12);
"#;

const BENCH_PRIME_SIEVE: &str = r#"
var count = 0;
for (var n = 2; n < 100; n = n + 1) {
    var isPrime = true;
    for (var i = 2; i * i <= n; i = i + 1) {
        if (n % i === 0) {
            isPrime = false;
            break;
        }
    }
    if (isPrime) {
        count = count + 1;
    }
}
count;
"#;

const BENCH_OBJECTS: &str = r#"
function Point(x, y) { this.x = x; this.y = y; }
var total = 0;
for (var i = 0; i < 500; i++) {
    var p = new Point(i, i + 1);
    for (var k in p) total += p[k];
}
total;
"#;

const BENCH_CLOSURES: &str = r#"
function counter() {
    var n = 0;
    return function () { n = n + 1; return n; };
}
var next = counter();
var last = 0;
for (var i = 0; i < 2000; i++) last = next();
last;
"#;

fn main() {
    println!("=======================================================");
    println!("  kiln - Performance Benchmarks");
    println!("  Generic bytecode vs analysed bytecode");
    println!("=======================================================\n");

    let benchmarks: Vec<(&str, &str, u32)> = vec![
        ("Fibonacci (n=20)", BENCH_FIBONACCI, 1000),
        ("Loop Sum (10K iterations)", BENCH_LOOP_SUM, 100),
        ("Nested Loops (100x100)", BENCH_NESTED_LOOPS, 100),
        ("Bitwise Operations (1K)", BENCH_BITWISE, 500),
        ("Conditionals (1K)", BENCH_CONDITIONALS, 500),
        ("Arithmetic (1K)", BENCH_ARITHMETIC, 500),
        ("Factorial (n=12)", BENCH_FACTORIAL, 5000),
        ("Prime Sieve (<100)", BENCH_PRIME_SIEVE, 200),
        ("Objects (500)", BENCH_OBJECTS, 200),
        ("Closures (2K calls)", BENCH_CLOSURES, 200),
    ];

    println!("{:<30} {:>14} {:>14} {:>10}", "Benchmark", "Generic", "Analysed", "Speedup");
    println!("{}", "-".repeat(70));

    let mut total_generic = Duration::ZERO;
    let mut total_analysed = Duration::ZERO;

    for (name, code, iterations) in &benchmarks {
        let generic = run_benchmark(name, code, *iterations, generic_config());
        let analysed = run_benchmark(name, code, *iterations, EngineConfig::default());
        total_generic += generic;
        total_analysed += analysed;

        let speedup = generic.as_secs_f64() / analysed.as_secs_f64();
        println!(
            "{:<30} {:>12.2?} {:>12.2?} {:>9.2}x",
            name, generic, analysed, speedup
        );
    }

    println!("{}", "-".repeat(70));
    let total_speedup = total_generic.as_secs_f64() / total_analysed.as_secs_f64();
    println!(
        "{:<30} {:>12.2?} {:>12.2?} {:>9.2}x",
        "TOTAL", total_generic, total_analysed, total_speedup
    );

    // Both configurations must agree
    println!("\n=======================================================");
    println!("  Correctness Verification");
    println!("=======================================================\n");

    let verifications: Vec<(&str, &str, f64)> = vec![
        ("Fibonacci", BENCH_FIBONACCI, 6765.0),
        ("Loop Sum", BENCH_LOOP_SUM, 49995000.0),
        ("Nested Loops", BENCH_NESTED_LOOPS, 10000.0),
        ("Factorial", BENCH_FACTORIAL, 479001600.0),
        ("Prime Count", BENCH_PRIME_SIEVE, 25.0),
        ("Objects", BENCH_OBJECTS, 250000.0),
        ("Closures", BENCH_CLOSURES, 2000.0),
    ];

    println!("{:<20} {:>12} {:>12} {:>12}", "Test", "Expected", "Generic", "Analysed");
    println!("{}", "-".repeat(58));

    for (name, code, expected) in verifications {
        let generic = completion(code, generic_config());
        let analysed = completion(code, EngineConfig::default());

        let g_status = if generic == expected { "✓" } else { "✗" };
        let a_status = if analysed == expected { "✓" } else { "✗" };
        println!(
            "{:<20} {:>12} {:>4} {:>7} {:>4} {:>7}",
            name, expected, g_status, generic, a_status, analysed
        );
    }
}
