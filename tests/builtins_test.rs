// Scenario tests for the builtin catalog
//
// Every expression is parsed, bound and evaluated against the same layered
// row. A `None` expectation means the expression must not produce a usable
// value: it either failed or came back Absent.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use rowexpr::{
    parse_expression, BindError, ContextReader, Evaluator, MapContext, NestedContext,
    ParserError, Value,
};
use serde_json::json;

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap().fixed_offset()
}

/// 2014-04-07 16:58:55 UTC, "Apr 7, 2014 4:58:55 PM"
fn reference() -> DateTime<FixedOffset> {
    utc(2014, 4, 7, 16, 58, 55)
}

fn user() -> MapContext {
    MapContext::from_json(
        json!({
            "Name": "Yoda",
            "Authenticated": true,
            "Address": {"City": "Detroit", "Zip": 55},
            "Roles": ["admin", "api"],
            "BankAmount": 55.5,
            "Hits": {"foo": 5},
        }),
        reference(),
    )
    .with("Created", utc(2015, 12, 18, 0, 0, 0))
}

fn row() -> MapContext {
    MapContext::with_time(reference())
        .with("event", "hello")
        .with("reg_date", "10/13/2014")
        .with("msdate", "1438445529707")
        .with("price", "$55")
        .with("email", "email@email.com")
        .with("emails", Value::strings(["email1@email.com", "email2@email.com"]))
        .with("url", "http://www.site.com/membership/all.html")
        .with("score_amount", "22")
        .with("tag_name", "bob")
        .with("tags", Value::strings(["a", "b", "c", "d"]))
        .with("sval", "event43,event4=63.00,event228")
        .with(
            "ua",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.11 (KHTML, like Gecko) Chrome/23.0.1271.97 Safari/537.11",
        )
        .with(
            "json",
            r#"[{"name":"n1","ct":8,"b":true, "tags":["a","b"]},{"name":"n2","ct":10,"b": false, "tags":["a","b"]}]"#,
        )
}

fn context() -> NestedContext {
    NestedContext::new(vec![Box::new(user()), Box::new(row())], reference())
}

fn b(v: bool) -> Option<Value> {
    Some(Value::Bool(v))
}

fn s(v: &str) -> Option<Value> {
    Some(Value::string(v))
}

fn i(v: i64) -> Option<Value> {
    Some(Value::Int(v))
}

fn n(v: f64) -> Option<Value> {
    Some(Value::Number(v))
}

fn list(items: &[&str]) -> Option<Value> {
    Some(Value::strings(items.iter().copied()))
}

fn map(entries: &[(&str, Value)]) -> Option<Value> {
    Some(Value::map(entries.iter().cloned()))
}

fn time(t: DateTime<FixedOffset>) -> Option<Value> {
    Some(Value::Time(t))
}

fn scenarios() -> Vec<(&'static str, Option<Value>)> {
    vec![
        // ── Logical ──
        ("eq(5,5)", b(true)),
        (r#"eq("hello", event)"#, b(true)),
        ("eq(5,6)", b(false)),
        ("eq(5.5,6)", b(false)),
        ("eq(true,eq(5,5))", b(true)),
        ("eq(true,false)", b(false)),
        ("eq(not_a_field,5)", b(false)),
        ("eq(eq(not_a_field,5),false)", b(true)),
        ("ne(5,5)", b(false)),
        (r#"ne("hello", event)"#, b(false)),
        (r#"ne("hello", fakeevent)"#, b(true)),
        ("ne(5,6)", b(true)),
        ("ne(true,eq(5,5))", b(false)),
        ("ne(true,false)", b(true)),
        (r#"ne(oneof(event,"yes"),"")"#, b(true)),
        (r#"eq(oneof(fakeevent,"yes"),"yes")"#, b(true)),
        ("not(true)", b(false)),
        ("not(eq(5,6))", b(true)),
        ("not(eq(5,not_a_field))", b(true)),
        (r#"not(eq(5,len("12345")))"#, b(false)),
        ("not(eq(5,len(not_a_field)))", b(true)),
        ("ge(5,5)", b(true)),
        ("ge(5,6)", b(false)),
        ("ge(5,3)", b(true)),
        ("ge(5.5,3)", b(true)),
        (r#"ge(5,"3")"#, b(true)),
        ("le(5,5)", b(true)),
        ("le(5,6)", b(true)),
        ("le(5,3)", b(false)),
        (r#"le(5,"3")"#, b(false)),
        ("lt(5,5)", b(false)),
        ("lt(5,6)", b(true)),
        ("lt(5,3)", b(false)),
        (r#"lt(5,"3")"#, b(false)),
        ("gt(5,5)", b(false)),
        ("gt(5,6)", b(false)),
        ("gt(5,3)", b(true)),
        (r#"gt(5,"3")"#, b(true)),
        (r#"gt(5,toint("3.5"))"#, b(true)),
        ("gt(toint(total_amount),0)", None),
        ("gt(toint(total_amount),0) || true", b(true)),
        ("gt(toint(price),1)", b(true)),
        ("exists(event)", b(true)),
        ("exists(price)", b(true)),
        ("exists(toint(price))", b(true)),
        ("exists(-1)", b(true)),
        ("exists(non_field)", b(false)),
        ("any(5)", b(true)),
        (r#"any("value")"#, b(true)),
        ("any(event)", b(true)),
        ("any(notrealfield)", b(false)),
        (r#"all("Apple")"#, b(true)),
        (r#"all("Apple",event)"#, b(true)),
        (r#"all("Apple",event,true)"#, b(true)),
        (r#"all("Linux",true,not_a_realfield)"#, b(false)),
        (r#"all("Linux",false)"#, b(false)),
        (r#"all("Linux","")"#, b(false)),
        (r#"all("Linux",notreal)"#, b(false)),
        (r#"oneof("apples","oranges")"#, s("apples")),
        ("oneof(notincontext,event)", s("hello")),
        (r#"oneof(not_a_field, email("Bob <bob@bob.com>"))"#, s("bob@bob.com")),
        ("oneof(email, email(not_a_field))", s("email@email.com")),
        (r#"oneof(email, email(not_a_field)) NOT IN ("a","b",10, 4.5) "#, b(true)),
        (r#"oneof(email, email(not_a_field)) IN ("email@email.com","b",10, 4.5) "#, b(true)),
        (r#"oneof(email, email(not_a_field)) IN ("b",10, 4.5) "#, b(false)),
        // ── Maps and lists ──
        ("map(event, 22)", map(&[("hello", Value::Int(22))])),
        ("map(event, toint(score_amount))", map(&[("hello", Value::Int(22))])),
        ("maptime(event)", map(&[("hello", Value::Time(reference()))])),
        (
            r#"maptime(event, "2016-02-03T22:00:00")"#,
            map(&[("hello", Value::Time(utc(2016, 2, 3, 22, 0, 0)))]),
        ),
        (r#"filtermatch(split(sval,","),"event4=")"#, list(&["event4=63.00"])),
        (r#"filtermatch(match("score_","tag_"),"amo*")"#, map(&[("amount", Value::string("22"))])),
        (r#"filter(match("score_","tag_"),"nam*")"#, map(&[("amount", Value::string("22"))])),
        (r#"filter(match("score_","tag_"),"name")"#, map(&[("amount", Value::string("22"))])),
        (r#"filter(split("apples,oranges",","),"ora*")"#, list(&["apples"])),
        (
            r#"filter(split("apples,oranges",","), ["ora*","notmatch","stuff"] )"#,
            list(&["apples"]),
        ),
        (r#"match("score_")"#, map(&[("amount", Value::string("22"))])),
        (
            r#"match("score_","tag_")"#,
            map(&[("amount", Value::string("22")), ("name", Value::string("bob"))]),
        ),
        (r#"mapkeys(match("score_","tag_"))"#, list(&["amount", "name"])),
        (r#"mapvalues(match("score_","tag_"))"#, list(&["22", "bob"])),
        ("mapvalues(will_not_match)", list(&[])),
        (
            r#"mapinvert(match("score_","tag_"))"#,
            map(&[("22", Value::string("amount")), ("bob", Value::string("name"))]),
        ),
        (r#"match("nonfield_")"#, None),
        (r#"len(["5","6"])"#, i(2)),
        (r#"len(split(reg_date,"/"))"#, i(3)),
        ("array.index(tags,1)", s("b")),
        ("array.index(tags, -1)", s("d")),
        ("array.index(tags,-2)", s("c")),
        ("array.index(tags,6)", None),
        ("array.index(tags,-6)", None),
        ("array.slice(tags,2)", list(&["c", "d"])),
        ("array.slice(tags,-2)", list(&["c", "d"])),
        ("array.slice(tags,-1)", list(&["d"])),
        ("array.slice(tags,1,3)", list(&["b", "c"])),
        ("array.slice(tags,1,4)", list(&["b", "c", "d"])),
        ("array.slice(tags,-3,-1)", list(&["b", "c"])),
        ("array.slice(tags,1,7)", None),
        ("array.slice(tags,1,-7)", None),
        ("array.slice(tags,-1,77)", None),
        // ── Strings ──
        (r#"contains("5tem",5)"#, b(true)),
        (r#"contains("5item","item")"#, b(true)),
        (r#"contains("the-hello",event)"#, b(true)),
        (r#"contains("the-item",event)"#, b(false)),
        (r#"contains(price,"$")"#, b(true)),
        (r#"contains(url,"membership/all.html")"#, b(true)),
        (r#"contains(not_a_field,"nope")"#, b(false)),
        (r#"false == contains(not_a_field,"nope")"#, b(true)),
        ("contains(tags, Address)", b(false)),
        (r#"contains(tags, "")"#, None),
        (r#"hasprefix("5tem",5)"#, b(true)),
        (r#"hasprefix("hello world",event)"#, b(true)),
        (r#"hasprefix(event,"he")"#, b(true)),
        (r#"hasprefix(event,"ham")"#, b(false)),
        (r#"hasprefix("5tem","5y")"#, b(false)),
        (r#"hasprefix("","5y")"#, b(false)),
        (r#"hasprefix(not_a_field,"5y")"#, b(false)),
        (r#"hasprefix("hello","")"#, None),
        (r#"hassuffix("tem","m")"#, b(true)),
        (r#"hassuffix("hello",event)"#, b(true)),
        (r#"hassuffix(event,"lo")"#, b(true)),
        (r#"hassuffix(event,"ham")"#, b(false)),
        (r#"hassuffix("5tem","5y")"#, b(false)),
        (r#"hassuffix("","5y")"#, b(false)),
        (r#"hassuffix(not_a_field,"5y")"#, b(false)),
        (r#"hassuffix("hello","")"#, None),
        (r#"tolower("Apple")"#, s("apple")),
        ("tolower(Address)", None),
        (r#"join("apple", event, "oranges", "--")"#, s("apple--hello--oranges")),
        (r#"join(["apple","peach"], ",")"#, s("apple,peach")),
        (r#"join("apple","","peach",",")"#, s("apple,peach")),
        (r#"join(split("apple,peach",","),"--")"#, s("apple--peach")),
        (r#"join("hello",Address)"#, None),
        (r#"join(Address,"--")"#, None),
        (r#"split("apples,oranges",",")"#, list(&["apples", "oranges"])),
        (r#"split(Address,",")"#, None),
        (r#"split("",",")"#, None),
        (r#"split("hello","")"#, None),
        (r#"strip("apples ")"#, s("apples")),
        (r#"strip(split("apples, oranges ",","))"#, list(&["apples", "oranges"])),
        (r#"strip(split(" apples, oranges ",","))"#, list(&["apples", "oranges"])),
        ("strip(split(\"apples\n\t, oranges \",\",\"))", list(&["apples", "oranges"])),
        ("strip(Address)", None),
        (r#"replace("M20:30","M")"#, s("20:30")),
        (r#"replace("/search/for+stuff","/search/")"#, s("for+stuff")),
        (r#"replace("M20:30","M","")"#, s("20:30")),
        (r#"replace("M20:30","M","Hour ")"#, s("Hour 20:30")),
        (r#"len("abc")"#, i(3)),
        ("len(not_a_field)", None),
        ("len(not_a_field) >= 10", b(false)),
        (r#"len("abc") >= 2"#, b(true)),
        (r#"CHAR_LENGTH("abc") "#, i(3)),
        (r#"CHAR_LENGTH(CAST("abc" AS CHAR))"#, i(3)),
        // ── Hashing and encoding ──
        (r#"hash.sip("http://www.google.com?q=123")"#, i(5673948842516703987)),
        (r#"hash.md5("hello")"#, s("5d41402abc4b2a76b9719d911017c592")),
        (r#"hash.sha1("hello")"#, s("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d")),
        (
            r#"hash.sha256("hello")"#,
            s("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"),
        ),
        (r#"hash.sip("http://www.google.com?q=123") % 10"#, i(5673948842516703987 % 10)),
        (r#"encoding.b64encode("hello world")"#, s("aGVsbG8gd29ybGQ=")),
        (r#"encoding.b64decode("aGVsbG8gd29ybGQ=")"#, s("hello world")),
        // ── Email, URL, user agent ──
        (r#"email("Bob@Bob.com")"#, s("bob@bob.com")),
        (r#"email("Bob <bob>")"#, None),
        (r#"email("Bob <bob@bob.com>")"#, s("bob@bob.com")),
        ("email(emails)", s("email1@email.com")),
        (r#"emailname("Bob<bob@bob.com>")"#, s("Bob")),
        (r#"emaildomain("Bob<bob@gmail.com>")"#, s("gmail.com")),
        (r#"host("https://www.Google.com/search?q=golang")"#, s("www.google.com")),
        (r#"host("www.Google.com/?q=golang")"#, s("www.google.com")),
        (
            r#"hosts("www.Google.com/?q=golang", "www.golang.org/")"#,
            list(&["www.google.com", "www.golang.org"]),
        ),
        (r#"urldecode("hello+world")"#, s("hello world")),
        (r#"urldecode("hello world")"#, s("hello world")),
        (r#"urldecode("2Live_Reg")"#, s("2Live_Reg")),
        (
            r#"urldecode("https%3A%2F%2Fwww.google.com%2Fsearch%3Fq%3Dgolang")"#,
            s("https://www.google.com/search?q=golang"),
        ),
        (r#"domain("https://www.Google.com/search?q=golang")"#, s("google.com")),
        (r#"domains("https://www.Google.com/search?q=golang")"#, list(&["google.com"])),
        (
            r#"domains("https://www.Google.com/search?q=golang","http://www.ign.com")"#,
            list(&["google.com", "ign.com"]),
        ),
        (r#"path("https://www.Google.com/search?q=golang")"#, s("/search")),
        (r#"path("https://www.Google.com/blog/hello.html")"#, s("/blog/hello.html")),
        (r#"path("www.Google.com/?q=golang")"#, s("/")),
        (r#"path("/home/aaron/vm")"#, s("/home/aaron/vm")),
        (r#"path("c://Windows/really")"#, s("//windows/really")),
        (r#"qs("https://www.Google.com/search?q=golang","q")"#, s("golang")),
        (r#"qs("www.Google.com/?q=golang","q")"#, s("golang")),
        (
            r#"url.matchqs("http://www.google.com/blog?mc_eid=123&mc_id=1&pid=123&utm_campaign=free")"#,
            s("www.google.com/blog"),
        ),
        (
            r#"url.matchqs("http://www.google.com/blog?mc_eid=123&mc_id=1&pid=123&utm_campaign=free", "pid", "mc_eid")"#,
            s("www.google.com/blog?mc_eid=123&pid=123"),
        ),
        (
            r#"url.matchqs("http://www.google.com/blog?mc_eid=123&mc_id=1&pid=123&utm_campaign=free", "mc_*")"#,
            s("www.google.com/blog?mc_eid=123&mc_id=1"),
        ),
        (r#"url.matchqs("http://www.google.com/blog")"#, s("www.google.com/blog")),
        (r#"url.matchqs("http://not a url")"#, None),
        (
            r#"urlminusqs("http://www.Google.com/search?q1=golang&q2=github","q1")"#,
            s("http://www.Google.com/search?q2=github"),
        ),
        (
            r#"urlminusqs("http://www.Google.com/search?q1=golang&q2=github","q3")"#,
            s("http://www.Google.com/search?q1=golang&q2=github"),
        ),
        (
            r#"urlminusqs("http://www.Google.com/search?q1=golang","q1")"#,
            s("http://www.Google.com/search"),
        ),
        (
            r#"urlmain("http://www.Google.com/search?q1=golang&q2=github")"#,
            s("www.Google.com/search"),
        ),
        (r#"useragent(ua, "os")"#, s("Linux x86_64")),
        // ── Casts ──
        ("cast(reg_date as time)", time(utc(2014, 10, 13, 0, 0, 0))),
        ("CAST(score_amount AS int)", i(22)),
        ("CAST(score_amount AS string)", s("22")),
        ("CAST(score_amount AS char)", Some(Value::ByteSlice(b"22".to_vec()))),
        (r#"todate("%d/%m/%Y","07/04/2014")"#, time(utc(2014, 4, 7, 0, 0, 0))),
        (r#"todate("4/7/14")"#, time(utc(2014, 4, 7, 0, 0, 0))),
        (r#"todate("Apr 7, 2014 4:58:55 PM")"#, time(reference())),
        (r#"todate("Apr 7, 2014 4:58:55 PM") < todate("now-3m")"#, b(true)),
        (r#"todate("02/01/2006","07/04/2014")"#, time(utc(2014, 4, 7, 0, 0, 0))),
        (r#"todate("1/2/06","4/7/14")"#, time(utc(2014, 4, 7, 0, 0, 0))),
        (r#"todate("02/01/2006","2014-04-07")"#, None),
        ("todate(20150704)", time(utc(2015, 7, 4, 0, 0, 0))),
        (
            r#"todatein("May 8, 2009 5:57:51 PM","America/Los_Angeles")"#,
            time(utc(2009, 5, 9, 0, 57, 51)),
        ),
        (r#"toint("5")"#, i(5)),
        (r#"toint("hello")"#, None),
        (r#"toint("$ 5.22")"#, i(5)),
        (r#"toint("5.56")"#, i(5)),
        (r#"toint("$5.56")"#, i(5)),
        (r#"toint("5,555.00")"#, i(5555)),
        (r#"toint("€ 5,555.00")"#, i(5555)),
        ("toint(5555.05)", i(5555)),
        (r#"tobool("true")"#, b(true)),
        (r#"tobool("t")"#, b(true)),
        (r#"tobool("f")"#, b(false)),
        (r#"tobool("hello")"#, None),
        (r#"tonumber("5")"#, n(5.0)),
        (r#"tonumber("hello")"#, None),
        (r#"tonumber("$ 5.22")"#, n(5.22)),
        (r#"tonumber("5.56")"#, n(5.56)),
        (r#"tonumber("$5.56")"#, n(5.56)),
        (r#"tonumber("5,555.00")"#, n(5555.0)),
        (r#"tonumber("€ 5,555.00")"#, n(5555.0)),
        // ── Dates ──
        (r#"seconds("M10:30")"#, n(630.0)),
        (r#"seconds(replace("M10:30","M"))"#, n(630.0)),
        (r#"seconds("M100:30")"#, n(6030.0)),
        (r#"seconds("00:30")"#, n(30.0)),
        (r#"seconds("30")"#, n(30.0)),
        ("seconds(30)", n(30.0)),
        (r#"seconds("2015/07/04")"#, n(1435968000.0)),
        (r#"seconds("nan")"#, None),
        (r#"seconds("inf")"#, None),
        (r#"yy("10/13/2014")"#, i(14)),
        (r#"yy("01/02/2006")"#, i(6)),
        ("yy()", i(14)),
        (r#"mm("10/13/2014")"#, i(10)),
        (r#"mm("01/02/2006")"#, i(1)),
        (r#"yymm("10/13/2014")"#, s("1410")),
        (r#"yymm("01/02/2006")"#, s("0601")),
        (r#"hourofday("Apr 7, 2014 4:58:55 PM")"#, i(16)),
        ("hourofday()", i(16)),
        (r#"hourofweek("Apr 7, 2014 4:58:55 PM")"#, i(40)),
        (r#"totimestamp("Apr 7, 2014 4:58:55 PM")"#, i(1396889935)),
        (r#"extract(reg_date, "%B")"#, s("October")),
        (r#"extract(reg_date, "%d")"#, s("13")),
        (r#"extract("1257894000", "%B - %d")"#, s("November - 10")),
        (r#"extract("1257894000000", "%B - %d")"#, s("November - 10")),
        (r#"unixtrunc("1438445529707")"#, s("1438445529")),
        (r#"unixtrunc("1438445529", "ms")"#, s("1438445529000")),
        ("unixtrunc(todate(msdate))", s("1438445529")),
        (r#"unixtrunc(todate(msdate), "seconds")"#, s("1438445529.707")),
        (r#"unixtrunc(reg_date, "milliseconds")"#, s("1413158400000")),
        (r#"unixtrunc(reg_date, "seconds")"#, s("1413158400.0")),
        // ── Math and aggregates ──
        ("pow(5,2)", n(25.0)),
        ("pow(2,2)", n(4.0)),
        ("pow(NotAField,2)", None),
        (r#"pow(5,"hello")"#, None),
        (r#"pow(5,"")"#, None),
        ("sqrt(4)", n(2.0)),
        ("sqrt(25)", n(5.0)),
        ("sqrt(NotAField)", None),
        (r#"sqrt("hello")"#, None),
        ("sum(1,2)", n(3.0)),
        ("sum(1,[2,3])", n(6.0)),
        (r#"sum(1,"2")"#, n(3.0)),
        (r#"sum(split("1,2", ","))"#, n(3.0)),
        (r#"sum(["1","2"])"#, n(3.0)),
        (r#"sum(["1","abc"])"#, None),
        (r#"sum("hello")"#, None),
        (r#"sum(exists("hello"))"#, None),
        ("avg(1,2)", n(1.5)),
        ("avg(1,[2,3])", n(2.0)),
        (r#"avg(1,"2")"#, n(1.5)),
        (r#"avg(["1","2"])"#, n(1.5)),
        (r#"avg(["1","2","abc"])"#, None),
        (r#"avg(split("1,2,3", ","))"#, n(2.0)),
        (r#"avg(split("1,2,abc", ","))"#, None),
        (r#"avg("hello")"#, None),
        ("count(4)", i(1)),
        ("count(not_a_field)", None),
        // ── JMESPath ──
        (r#"json.jmespath(json, "[?name == 'n1'].name | [0]")"#, s("n1")),
        (r#"json.jmespath(json, "[?b].ct | [0]")"#, n(8.0)),
        (r#"json.jmespath(json, "[?b].b | [0]")"#, b(true)),
        (r#"json.jmespath(json, "[?b].tags | [0]")"#, list(&["a", "b"])),
        (r#"json.jmespath(not_field, "[?b].tags | [0]")"#, None),
        (r#"json.jmespath(json, "[?b].tags | [0 ")"#, None),
        // ── Fields from the user layer ──
        (r#"eq(Name, "Yoda")"#, b(true)),
        (r#"contains(Roles, "api")"#, b(true)),
        (r#"json.jmespath(Address, "City")"#, s("Detroit")),
        ("len(Hits)", i(1)),
        ("yy(Created)", i(15)),
        ("gt(BankAmount, 50)", b(true)),
    ]
}

#[test]
fn test_builtin_scenarios() {
    let ctx = context();
    let evaluator = Evaluator::new();
    let mut failures = Vec::new();

    for (text, expected) in scenarios() {
        let expr = match parse_expression(text) {
            Ok(expr) => expr,
            Err(e) => {
                failures.push(format!("{}: parse error {}", text, e));
                continue;
            }
        };
        let actual = evaluator.eval_ok(&ctx, &expr);
        if actual != expected {
            failures.push(format!("{}: expected {:?}, got {:?}", text, expected, actual));
        }
    }

    assert!(failures.is_empty(), "{} failures:\n{}", failures.len(), failures.join("\n"));
}

#[test]
fn test_evaluation_is_deterministic() {
    let ctx = context();
    let evaluator = Evaluator::new();
    for (text, _) in scenarios() {
        let expr = parse_expression(text).unwrap();
        assert_eq!(evaluator.eval(&ctx, &expr), evaluator.eval(&ctx, &expr), "{}", text);
    }
}

#[test]
fn test_bind_validation() {
    let invalid = [
        "sqrt()",
        "sqrt(1,2)",
        "pow()",
        "pow(1)",
        "avg()",
        "sum()",
        "count()",
        "count(a,b,c)",
        "contains()",
        "contains(a,b,c)",
        "tolower()",
        "tolower(a,b)",
        "split()",
        r#"split(a,",","hello")"#,
        "strip()",
        r#"strip(a,"--")"#,
        "replace(arg)",
        r#"replace(arg,"with","replaceval","toomany")"#,
        r#"join("hello")"#,
        "hasprefix()",
        r#"hasprefix(a,b,"c")"#,
        "hassuffix()",
        r#"hassuffix(a,b,"c")"#,
        r#"todatein("May 8, 2009 5:57:51 PM")"#,
        r#"todatein("May 8, 2009 5:57:51 PM","PDT")"#,
        r#"todatein("May 8, 2009 5:57:51 PM","PDT","MORE")"#,
        r#"todatein("May 8, 2009 5:57:51 PM", invalid_identity)"#,
        "json.jmespath(json)",
        "json.jmespath(json, 1)",
        "cast(x AS blob)",
        "not_a_function(1)",
    ];
    for text in invalid {
        assert!(parse_expression(text).is_err(), "{} should not bind", text);
    }
}

#[test]
fn test_bind_error_messages() {
    assert_eq!(
        parse_expression("sqrt(1,2)").unwrap_err().to_string(),
        "sqrt expects 1 arg, got 2"
    );
    assert!(matches!(
        parse_expression("json.jmespath(json, 1)"),
        Err(ParserError::Bind(BindError::LiteralRequired { position: 2, .. }))
    ));
    assert!(matches!(
        parse_expression("nope(1)"),
        Err(ParserError::Bind(BindError::UnknownFunction(_)))
    ));
}

#[test]
fn test_eq_ne_complementary_over_row() {
    let ctx = context();
    let evaluator = Evaluator::new();
    let operands = ["5", "5.5", "event", "not_a_field", "tags", "Address", r#""hello""#, "true"];
    for a in operands {
        for c in operands {
            let eq = parse_expression(&format!("eq({}, {})", a, c)).unwrap();
            let ne = parse_expression(&format!("ne({}, {})", a, c)).unwrap();
            let eq = evaluator.eval(&ctx, &eq).unwrap();
            let ne = evaluator.eval(&ctx, &ne).unwrap();
            assert_eq!(eq.as_bool().map(|v| !v), ne.as_bool(), "eq/ne({}, {})", a, c);
        }
    }
}

#[test]
fn test_context_layers() {
    let ctx = context();
    assert_eq!(ctx.get("Name"), Some(Value::string("Yoda")));
    assert_eq!(ctx.get("event"), Some(Value::string("hello")));
    assert_eq!(ctx.get("missing"), None);
    assert_eq!(ctx.reference_time(), reference());
}
