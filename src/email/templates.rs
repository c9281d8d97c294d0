pub fn render_reset_notice(title: &str) -> String {
    format!("This is a courtesy message from {title}.  Your password was just reset.  Cheers!")
}

pub fn render_reset_link(title: &str, reset_url: &str) -> String {
    format!(
        "A password reset was requested for your {title} account.\n\n\
         Follow this link to choose a new password:\n\n\
         {reset_url}\n\n\
         If you didn't request this, you can ignore this email."
    )
}
