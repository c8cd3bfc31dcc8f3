//! Persian (fa-IR) formatting for prices, discounts and product types

const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];
const THOUSANDS_SEPARATOR: char = '٬';
const DECIMAL_SEPARATOR: char = '٫';

pub const FREE_LABEL: &str = "رایگان";
pub const CURRENCY: &str = "تومان";

/// Replace ASCII digits with Persian digits, leaving everything else untouched
pub fn to_persian_digits(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_digit() {
                PERSIAN_DIGITS[(c as u8 - b'0') as usize]
            } else {
                c
            }
        })
        .collect()
}

/// Price in toman, or the "free" label for zero
pub fn format_price(price: f64) -> String {
    if price == 0.0 {
        return FREE_LABEL.to_string();
    }
    format!("{} {}", format_number(price), CURRENCY)
}

/// Number rendered the way the fa-IR locale does: grouped, at most 3 decimals
pub fn format_number(value: f64) -> String {
    // Thousandths, so rounding happens once
    let scaled = (value.abs() * 1000.0).round() as u64;
    let whole = scaled / 1000;
    let fraction = scaled % 1000;

    let mut out = String::new();
    if value < 0.0 && scaled > 0 {
        out.push('-');
    }
    out.push_str(&group_thousands(whole));
    if fraction > 0 {
        let digits = format!("{:03}", fraction);
        out.push(DECIMAL_SEPARATOR);
        out.push_str(digits.trim_end_matches('0'));
    }
    to_persian_digits(&out)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(THOUSANDS_SEPARATOR);
        }
        out.push(c);
    }
    out
}

pub fn format_discount(percent: u32) -> String {
    format!("{}% تخفیف", to_persian_digits(&percent.to_string()))
}

/// Persian name for a product type code; unknown codes pass through
pub fn product_type_label(product_type: &str) -> &str {
    match product_type {
        "course" => "دوره",
        "ebook" => "کتاب الکترونیکی",
        "workshop" => "کارگاه",
        "physical" => "محصول فیزیکی",
        other => other,
    }
}

/// Call-to-action button text for a product
pub fn product_cta(product_type: &str, price: f64) -> &'static str {
    if price == 0.0 {
        return "دریافت رایگان";
    }
    match product_type {
        "course" => "شرکت در دوره",
        "ebook" => "دانلود کتاب",
        "workshop" => "ثبت نام کارگاه",
        "physical" => "خرید محصول",
        _ => "مشاهده محصول",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_persian_digits() {
        assert_eq!(to_persian_digits("0123456789"), "۰۱۲۳۴۵۶۷۸۹");
        assert_eq!(to_persian_digits("ab 12-x"), "ab ۱۲-x");
        assert_eq!(to_persian_digits(""), "");
    }

    #[test]
    fn test_format_price_free() {
        assert_eq!(format_price(0.0), "رایگان");
    }

    #[test]
    fn test_format_price_groups_thousands() {
        assert_eq!(format_price(1_250_000.0), "۱٬۲۵۰٬۰۰۰ تومان");
        assert_eq!(format_price(999.0), "۹۹۹ تومان");
        assert_eq!(format_price(1000.0), "۱٬۰۰۰ تومان");
    }

    #[test]
    fn test_format_number_fraction() {
        assert_eq!(format_number(12.5), "۱۲٫۵");
        assert_eq!(format_number(0.1234), "۰٫۱۲۳");
        assert_eq!(format_number(-1500.0), "-۱٬۵۰۰");
    }

    #[test]
    fn test_format_discount() {
        assert_eq!(format_discount(25), "۲۵% تخفیف");
    }

    #[test]
    fn test_product_type_label() {
        assert_eq!(product_type_label("course"), "دوره");
        assert_eq!(product_type_label("ebook"), "کتاب الکترونیکی");
        assert_eq!(product_type_label("bundle"), "bundle");
    }

    #[test]
    fn test_product_cta() {
        assert_eq!(product_cta("course", 0.0), "دریافت رایگان");
        assert_eq!(product_cta("workshop", 10.0), "ثبت نام کارگاه");
        assert_eq!(product_cta("", 10.0), "مشاهده محصول");
    }
}
