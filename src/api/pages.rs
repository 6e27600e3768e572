//! Static HTML served by the web variant

/// Request form served at `GET /`
pub const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Mashup Generator</title></head>
<body>
    <h1>Create Your Audio Mashup</h1>
    <form method="post" action="/generate">
        Singer Name: <input type="text" name="singer" required><br><br>
        Number of Videos (N &gt; 10): <input type="number" name="n" min="11" required><br><br>
        Duration per Video (Y &gt; 20 seconds): <input type="number" name="y" min="21" required><br><br>
        Your Email ID: <input type="email" name="email" required><br><br>
        <input type="submit" value="Generate Mashup">
    </form>
</body>
</html>
"#;

/// Acknowledgment returned by `POST /generate` once a job is running
pub const ACK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Processing...</title></head>
<body>
    <h1>Your mashup is being generated!</h1>
    <p>This may take several minutes. You'll receive an email with the ZIP file when it's ready.</p>
    <p><a href="/">Back to Form</a></p>
</body>
</html>
"#;
