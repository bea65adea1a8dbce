//! Inline HTML pages served by the demo

/// Headline classifier page
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Headline Title Classifier</title>
    <script src="https://cdn.tailwindcss.com"></script>
    <style>
        @keyframes pulse { 0%, 100% { opacity: 1; } 50% { opacity: 0.5; } }
        .animate-pulse { animation: pulse 2s cubic-bezier(0.4, 0, 0.6, 1) infinite; }
    </style>
</head>
<body class="bg-gray-900 text-white min-h-screen">
    <div class="container mx-auto px-4 py-8 max-w-3xl">
        <header class="mb-8">
            <h1 class="text-4xl font-bold text-blue-400">Headline Title Classifier</h1>
            <p class="text-gray-400 mt-2">
                This app will categorize a headline title using a pre-trained
                NLP classifier. Please feel free to try your own headline text.
            </p>
        </header>

        <div class="bg-gray-800 rounded-lg p-6 mb-6">
            <label for="headline" class="block text-sm text-gray-400 mb-2">Headline</label>
            <div class="flex gap-3">
                <input id="headline" type="text"
                       class="flex-1 bg-gray-700 rounded px-3 py-2 focus:outline-none focus:ring-2 focus:ring-blue-500">
                <button id="run" onclick="run()"
                        class="bg-blue-600 hover:bg-blue-700 px-6 py-2 rounded font-semibold">
                    Run
                </button>
            </div>
        </div>

        <div id="busy" class="hidden bg-gray-800 rounded-lg p-4 mb-6 text-yellow-400 animate-pulse"></div>
        <div id="error" class="hidden bg-red-900 rounded-lg p-4 mb-6"></div>

        <div class="bg-gray-800 rounded-lg p-6">
            <p id="placeholder" class="font-semibold">Please click Run to generate predictions</p>
            <table id="results" class="hidden w-full text-left">
                <thead>
                    <tr class="text-gray-400 border-b border-gray-700">
                        <th class="py-2">Model Name</th>
                        <th class="py-2">Predicted Category</th>
                        <th class="py-2">Predicted Score</th>
                    </tr>
                </thead>
                <tbody id="rows"></tbody>
            </table>
        </div>

        <footer class="mt-8 text-sm text-gray-500">
            <a href="/hello" class="hover:text-gray-300">Hello page</a>
        </footer>
    </div>

    <script>
        const busy = document.getElementById('busy');
        const errorBox = document.getElementById('error');

        function show(el, text) {
            el.textContent = text;
            el.classList.remove('hidden');
        }

        function hide(el) {
            el.classList.add('hidden');
        }

        function cell(text, cls) {
            const td = document.createElement('td');
            td.className = 'py-2 ' + (cls || '');
            td.textContent = text;
            return td;
        }

        async function init() {
            const res = await fetch('/api/models');
            const data = await res.json();
            document.getElementById('headline').value = data.default_headline;
            window.modelNames = data.models.filter(m => !m.cached).map(m => m.name);
        }

        async function run() {
            const headline = document.getElementById('headline').value;
            const button = document.getElementById('run');
            hide(errorBox);
            button.disabled = true;

            const pending = window.modelNames || [];
            if (pending.length > 0) {
                show(busy, 'Loading NLP (' + pending.join(', ') + ') models... ' +
                    '(note this could take a few min as models can be large)');
            } else {
                show(busy, 'Running...');
            }

            try {
                const res = await fetch('/api/predict', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ headline })
                });
                const data = await res.json();
                if (!res.ok) {
                    show(errorBox, data.error || 'Request failed');
                    return;
                }
                render(data);
                window.modelNames = [];
            } catch (e) {
                show(errorBox, 'Request failed: ' + e);
            } finally {
                hide(busy);
                button.disabled = false;
            }
        }

        function render(table) {
            const rows = document.getElementById('rows');
            rows.innerHTML = '';
            for (const row of table.rows) {
                const tr = document.createElement('tr');
                tr.className = 'border-b border-gray-700';
                tr.appendChild(cell(row.model_name, 'font-mono'));
                if (row.status === 'predicted') {
                    tr.appendChild(cell(row.category, 'text-green-400'));
                    tr.appendChild(cell(row.score.toFixed(3), 'font-mono'));
                } else {
                    tr.appendChild(cell('error (' + row.kind + ')', 'text-red-400'));
                    tr.appendChild(cell(row.message, 'text-red-300 text-sm'));
                }
                rows.appendChild(tr);
            }
            hide(document.getElementById('placeholder'));
            document.getElementById('results').classList.remove('hidden');
        }

        init();
    </script>
</body>
</html>
"#;

/// Hello page: a small table and its line chart
pub const HELLO_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Hello</title>
    <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gray-900 text-white min-h-screen">
    <div class="container mx-auto px-4 py-8 max-w-3xl">
        <h1 class="text-4xl font-bold text-blue-400 mb-4">Hello!</h1>
        <p class="text-gray-400 mb-6">Generate data and display the dataframe</p>

        <button onclick="load(true)"
                class="bg-blue-600 hover:bg-blue-700 px-6 py-2 rounded font-semibold mb-6">
            Shuffle Data
        </button>

        <div class="bg-gray-800 rounded-lg p-6 mb-6">
            <table class="w-full text-left font-mono">
                <thead id="head"></thead>
                <tbody id="body"></tbody>
            </table>
        </div>

        <div class="bg-gray-800 rounded-lg p-6">
            <svg id="chart" viewBox="0 0 400 200" class="w-full"></svg>
        </div>
    </div>

    <script>
        const COLORS = ['#60a5fa', '#f87171'];

        async function load(shuffle) {
            const res = await fetch('/api/hello/data?shuffle=' + shuffle);
            const data = await res.json();
            renderTable(data);
            renderChart(data);
        }

        function renderTable(data) {
            document.getElementById('head').innerHTML =
                '<tr class="text-gray-400"><th></th>' +
                data.columns.map(c => '<th class="py-1">' + c + '</th>').join('') + '</tr>';
            document.getElementById('body').innerHTML = data.rows
                .map((r, i) => '<tr><td class="text-gray-500 py-1">' + i + '</td>' +
                    r.map(v => '<td class="py-1">' + v + '</td>').join('') + '</tr>')
                .join('');
        }

        function renderChart(data) {
            const w = 400, h = 200, pad = 20;
            const max = Math.max(1, ...data.rows.flat());
            const x = i => pad + i * (w - 2 * pad) / Math.max(1, data.rows.length - 1);
            const y = v => h - pad - v * (h - 2 * pad) / max;

            let svg = '';
            data.columns.forEach((name, c) => {
                const points = data.rows.map((r, i) => x(i) + ',' + y(r[c])).join(' ');
                svg += '<polyline fill="none" stroke-width="2" stroke="' + COLORS[c % COLORS.length] +
                    '" points="' + points + '"/>';
                svg += '<text x="' + (w - pad - 30) + '" y="' + (pad + c * 14) + '" fill="' +
                    COLORS[c % COLORS.length] + '" font-size="12">' + name + '</text>';
            });
            document.getElementById('chart').innerHTML = svg;
        }

        load(false);
    </script>
</body>
</html>
"#;
