// Walkthrough of the builtin catalog against a single event row
//
// Run with: cargo run --example eval_demo

use rowexpr::{builtins, Expression, FunctionCategory, MapContext, Value};

fn main() {
    println!("=== rowexpr Demo ===\n");

    let row = MapContext::new()
        .with("event", "Signup")
        .with("price", "$55.20")
        .with("reg_date", "10/13/2014")
        .with("email", "Bob <Bob@Example.com>")
        .with("url", "https://www.example.com/join?utm_source=ad&pid=7")
        .with("tags", Value::strings(["new", "promo"]));

    demo_catalog();
    demo_expressions(&row);
    demo_missing_values(&row);
    demo_bind_errors();
}

fn demo_catalog() {
    println!("--- Catalog ---");
    let registry = builtins();
    for category in [
        FunctionCategory::Logical,
        FunctionCategory::Collections,
        FunctionCategory::Strings,
        FunctionCategory::Cast,
        FunctionCategory::Math,
        FunctionCategory::Time,
        FunctionCategory::Hash,
        FunctionCategory::Web,
        FunctionCategory::Json,
    ] {
        let names: Vec<&str> = registry.in_category(category).iter().map(|d| d.name).collect();
        println!("{:?}: {}", category, names.join(", "));
    }
    println!();
}

fn demo_expressions(row: &MapContext) {
    println!("--- Expressions ---");
    for text in [
        r#"tolower(event)"#,
        r#"toint(price) * 2"#,
        r#"extract(reg_date, "%B %Y")"#,
        r#"email(email)"#,
        r#"domain(url)"#,
        r#"url.matchqs(url, "pid")"#,
        r#"contains(tags, "promo") AND toint(price) > 50"#,
        r#"hash.md5(event)"#,
    ] {
        show(text, row);
    }
    println!();
}

fn demo_missing_values(row: &MapContext) {
    println!("--- Missing values ---");
    for text in [
        "not_a_field",
        "exists(not_a_field)",
        "not(eq(5, len(not_a_field)))",
        r#"oneof(toint(event), "fallback")"#,
        "toint(event)",
    ] {
        show(text, row);
    }
    println!();
}

fn demo_bind_errors() {
    println!("--- Bind errors ---");
    for text in ["sqrt(1, 2)", "json.jmespath(doc, path)", "nosuchfn(1)"] {
        match Expression::compile(text) {
            Ok(_) => println!("{:<40} => compiled", text),
            Err(e) => println!("{:<40} => {}", text, e),
        }
    }
}

fn show(text: &str, row: &MapContext) {
    let result = Expression::compile(text).and_then(|expr| expr.evaluate(row));
    match result {
        Ok(value) => println!("{:<50} => {:?}", text, value),
        Err(e) => println!("{:<50} => error: {}", text, e),
    }
}
