use chrono::{Datelike, Utc};

use crate::Email;

struct Layout<'a> {
    heading: &'a str,
    intro: &'a str,
    button: &'a str,
    link: &'a str,
    ignore: &'a str,
    validity: &'a str,
}

fn render(layout: Layout<'_>) -> String {
    let year = Utc::now().year();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{heading}</title>
  <style>
    body {{ font-family: 'Inter', sans-serif; margin: 0; padding: 0; background-color: #f4f4f5; }}
    .container {{ max-width: 600px; margin: 40px auto; background-color: #ffffff; border-radius: 8px; overflow: hidden; }}
    .header {{ background-color: #2563eb; padding: 32px; text-align: center; }}
    .logo {{ font-size: 24px; font-weight: 700; color: #ffffff; margin: 0; }}
    .content {{ padding: 32px; color: #1f2937; }}
    p {{ font-size: 16px; line-height: 1.5; margin: 0 0 24px; color: #4b5563; }}
    .button {{ display: inline-block; background-color: #2563eb; color: #ffffff; padding: 12px 24px; border-radius: 6px; text-decoration: none; font-weight: 500; }}
    .notice {{ font-size: 14px; color: #6b7280; border-top: 1px solid #e5e7eb; padding-top: 24px; }}
    .footer {{ background-color: #f9fafb; padding: 24px 32px; text-align: center; font-size: 14px; color: #6b7280; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header"><h1 class="logo">QR Service</h1></div>
    <div class="content">
      <h1>{heading}</h1>
      <p>Hello,</p>
      <p>{intro}</p>
      <a href="{link}" class="button">{button}</a>
      <p>If the button does not work, copy this link into your browser:<br>{link}</p>
      <p>{ignore}</p>
      <div class="notice"><p>For security reasons, this link will expire in {validity}.</p></div>
    </div>
    <div class="footer">
      <p>This email was sent by QR Service. Please do not reply to this email.</p>
      <p>&copy; {year} QR Service. All rights reserved.</p>
    </div>
  </div>
</body>
</html>"#,
        heading = layout.heading,
        intro = layout.intro,
        button = layout.button,
        link = layout.link,
        ignore = layout.ignore,
        validity = layout.validity,
        year = year,
    )
}

pub fn verification_email(to: &str, link: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Verify your email".to_string(),
        html: render(Layout {
            heading: "Verify Your Email",
            intro: "Thank you for registering with QR Service. Please click the button below to verify your email address.",
            button: "Verify Email",
            link,
            ignore: "If you didn't create an account with QR Service, you can safely ignore this email.",
            validity: "24 hours",
        }),
    }
}

pub fn reset_password_email(to: &str, link: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        html: render(Layout {
            heading: "Reset Your Password",
            intro: "We received a request to reset your password. Click the button below to create a new password.",
            button: "Reset Password",
            link,
            ignore: "If you didn't request a password reset, you can safely ignore this email. Your password will remain unchanged.",
            validity: "1 hour",
        }),
    }
}
